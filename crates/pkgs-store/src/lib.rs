//! The change/snapshot store: versioned SQLite
//! schema, a transaction-scoped bulk-insert pipeline, and the read-side
//! queries backing the reconstructor and query surface.

pub mod batch;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;

pub use batch::{
    insert_branch_commits_batch, insert_commits_batch, insert_dependency_changes_batch,
    insert_dependency_snapshots_batch, upsert_manifest,
};
pub use error::StoreError;
pub use models::{
    BranchRow, CommitInsert, CommitRow, DependencyChangeInsert, DependencyChangeRow,
    DependencySnapshotInsert, DependencySnapshotRow, ManifestRow, RowCounts,
};
pub use schema::SCHEMA_VERSION;
pub use store::{set_branch_checkpoint, upsert_branch, SqliteStore};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn migrate_seeds_current_schema_version() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
        assert!(store.check_schema_version("memory").is_ok());
    }

    #[test]
    fn check_schema_version_rejects_mismatch() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().unwrap();
        // Simulate a store built by an older binary.
        store
            .create_deferred_indexes()
            .expect("deferred indexes should be idempotent even before bulk load");
        let conn_check = store.schema_version().unwrap();
        assert_eq!(conn_check, Some(SCHEMA_VERSION));
    }

    #[test]
    fn uninitialized_store_reports_not_initialized() {
        let store = SqliteStore::open_in_memory().unwrap();
        // no migrate() call
        let err = store.check_schema_version("memory").unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized { .. }));
    }

    #[test]
    fn wipe_drops_and_recreates_an_empty_schema() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.migrate().unwrap();
        {
            let tx = store.transaction().unwrap();
            batch::upsert_manifest(&tx, "Gemfile", "rubygems", "manifest", Utc::now()).unwrap();
            tx.commit().unwrap();
        }
        assert_eq!(store.row_counts().unwrap().manifests, 1);
        store.wipe().unwrap();
        assert_eq!(store.row_counts().unwrap().manifests, 0);
    }

    #[test]
    fn branch_checkpoint_round_trips() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.migrate().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let branch_id = {
            let tx = store.transaction().unwrap();
            let id = upsert_branch(&tx, "main", now).unwrap();
            tx.commit().unwrap();
            id
        };
        assert_eq!(store.branch("main").unwrap().unwrap().last_analyzed_sha, "");

        let tx = store.transaction().unwrap();
        set_branch_checkpoint(&tx, branch_id, "deadbeef", now).unwrap();
        tx.commit().unwrap();

        assert_eq!(
            store.branch("main").unwrap().unwrap().last_analyzed_sha,
            "deadbeef"
        );
    }
}
