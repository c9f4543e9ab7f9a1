use pkgs_git::GitError;
use pkgs_store::StoreError;
use serde_json::json;

/// Errors raised by the reconstructor and query surface. Kept distinct from
/// `CliError` (one error enum per crate/concern, never a shared monolith)
/// even though both live in this binary crate, since the reconstructor and
/// queries modules are the library half callers other than the CLI could
/// reuse.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("commit not found: {sha}")]
    CommitNotFound { sha: String },
    #[error("unknown ecosystem recorded in store: {0}")]
    BadEcosystem(String),
    #[error("unknown dependency type recorded in store: {0}")]
    BadDependencyType(String),
    #[error("unknown manifest kind recorded in store: {0}")]
    BadManifestKind(String),
}

/// The command-boundary error type: every component error is
/// caught here, mapped to a human-readable message and an exit code, and
/// — under `--format=json` — to `{"error": {"kind", "message"}}`.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("usage error: {0}")]
    Usage(String),
    #[error("interrupted, partial progress saved")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// exit codes: 0 success, 1 recoverable error, 2 usage error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            _ => 1,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Git(GitError::RefNotFound { .. }) => "RefNotFound",
            CliError::Git(GitError::NotARepository { .. }) => "NotInGitRepo",
            CliError::Git(_) => "GitError",
            CliError::Store(StoreError::SchemaOutdated { .. }) => "SchemaOutdated",
            CliError::Store(StoreError::NotInitialized { .. }) => "NotInitialized",
            CliError::Store(StoreError::Busy) => "StoreBusy",
            CliError::Store(_) => "StoreError",
            CliError::Query(QueryError::Store(StoreError::SchemaOutdated { .. })) => "SchemaOutdated",
            CliError::Query(QueryError::Store(StoreError::NotInitialized { .. })) => "NotInitialized",
            CliError::Query(QueryError::CommitNotFound { .. }) => "RefNotFound",
            CliError::Query(_) => "QueryError",
            CliError::Usage(_) => "UsageError",
            CliError::Cancelled => "Cancelled",
            CliError::Other(_) => "Error",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({ "error": { "kind": self.kind(), "message": self.to_string() } })
    }
}
