//! Schema DDL and the version constant. Kept as one module so the constant
//! always lives next to the tables it describes — a mismatch between
//! `SCHEMA_VERSION` and a stored `schema_info.version` row is refused
//! outright, never migrated incrementally.

/// Bump this whenever a table shape changes. There is no migration path:
/// a mismatch sends the caller to `git-pkgs init --force` / `upgrade`.
pub const SCHEMA_VERSION: i64 = 1;

/// Tables and their primary/unique constraints, created eagerly by
/// `migrate()`. Secondary lookup indexes are deferred (see
/// `DEFERRED_INDEXES`) per "indexes created after bulk data
/// load, not during".
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schema_info (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS branches (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    last_analyzed_sha TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS commits (
    id INTEGER PRIMARY KEY,
    sha TEXT NOT NULL UNIQUE,
    message TEXT NOT NULL,
    author_name TEXT NOT NULL,
    author_email TEXT NOT NULL,
    committed_at TEXT NOT NULL,
    has_dependency_changes INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS branch_commits (
    id INTEGER PRIMARY KEY,
    branch_id INTEGER NOT NULL REFERENCES branches(id),
    commit_id INTEGER NOT NULL REFERENCES commits(id),
    position INTEGER NOT NULL,
    UNIQUE(branch_id, commit_id)
);

CREATE TABLE IF NOT EXISTS manifests (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    ecosystem TEXT NOT NULL,
    kind TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dependency_changes (
    id INTEGER PRIMARY KEY,
    commit_id INTEGER NOT NULL REFERENCES commits(id),
    manifest_id INTEGER NOT NULL REFERENCES manifests(id),
    name TEXT NOT NULL,
    ecosystem TEXT NOT NULL,
    change_type TEXT NOT NULL,
    requirement TEXT NOT NULL,
    previous_requirement TEXT,
    dependency_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dependency_snapshots (
    id INTEGER PRIMARY KEY,
    commit_id INTEGER NOT NULL REFERENCES commits(id),
    manifest_id INTEGER NOT NULL REFERENCES manifests(id),
    name TEXT NOT NULL,
    ecosystem TEXT NOT NULL,
    requirement TEXT NOT NULL,
    dependency_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(commit_id, manifest_id, name)
);
"#;

/// Secondary indexes, created once after the initial bulk load completes.
pub const DEFERRED_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_dependency_changes_name ON dependency_changes(name);
CREATE INDEX IF NOT EXISTS idx_dependency_changes_ecosystem ON dependency_changes(ecosystem);
CREATE INDEX IF NOT EXISTS idx_dependency_changes_commit_name ON dependency_changes(commit_id, name);
CREATE INDEX IF NOT EXISTS idx_dependency_snapshots_name ON dependency_snapshots(name);
CREATE INDEX IF NOT EXISTS idx_dependency_snapshots_ecosystem ON dependency_snapshots(ecosystem);
CREATE INDEX IF NOT EXISTS idx_commits_committed_at ON commits(committed_at);
CREATE INDEX IF NOT EXISTS idx_branch_commits_commit ON branch_commits(commit_id);
"#;

pub const DROP_TABLES: &str = r#"
DROP TABLE IF EXISTS dependency_snapshots;
DROP TABLE IF EXISTS dependency_changes;
DROP TABLE IF EXISTS manifests;
DROP TABLE IF EXISTS branch_commits;
DROP TABLE IF EXISTS commits;
DROP TABLE IF EXISTS branches;
DROP TABLE IF EXISTS schema_info;
"#;
