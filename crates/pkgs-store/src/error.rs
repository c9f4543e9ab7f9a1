#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {source}")]
    Sql {
        #[from]
        source: rusqlite::Error,
    },
    #[error("store is not initialized at {path}; run `git-pkgs init` first")]
    NotInitialized { path: String },
    #[error("schema version mismatch: index was built with version {stored}, this binary expects {code}; rebuild with `git-pkgs init --force`")]
    SchemaOutdated { stored: i64, code: i64 },
    #[error("store is locked by another process")]
    Busy,
    #[error("branch not found: {name}")]
    BranchNotFound { name: String },
    #[error("commit not found: {sha}")]
    CommitNotFound { sha: String },
    #[error("timestamp '{value}' could not be parsed: {source}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Classifies a raw `rusqlite::Error` into `StoreError::Busy` when the
/// failure is SQLite's own write-lock contention ("concurrent
/// processes would collide and must be rejected by the store's file
/// lock"), otherwise wraps it generically.
pub fn classify(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref sqlite_err, _) = err {
        if sqlite_err.code == rusqlite::ErrorCode::DatabaseBusy
            || sqlite_err.code == rusqlite::ErrorCode::DatabaseLocked
        {
            return StoreError::Busy;
        }
    }
    StoreError::Sql { source: err }
}
