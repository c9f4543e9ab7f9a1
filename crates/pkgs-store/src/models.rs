//! Row and insert shapes moved across the `pkgs-store` boundary. Insert
//! structs carry no surrogate id (the store assigns one); row structs are
//! what query helpers hand back to the reconstructor and query surface.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchRow {
    pub id: i64,
    pub name: String,
    pub last_analyzed_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInsert {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub committed_at: DateTime<Utc>,
    pub has_dependency_changes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRow {
    pub id: i64,
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub committed_at: DateTime<Utc>,
    pub has_dependency_changes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub id: i64,
    pub path: String,
    pub ecosystem: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChangeInsert {
    pub commit_id: i64,
    pub manifest_id: i64,
    pub name: String,
    pub ecosystem: String,
    pub change_type: String,
    pub requirement: String,
    pub previous_requirement: Option<String>,
    pub dependency_type: String,
}

/// A change row joined with enough commit/manifest context for the query
/// surface (history, blame, show, log) to render without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyChangeRow {
    pub id: i64,
    pub commit_id: i64,
    pub commit_sha: String,
    pub committed_at: DateTime<Utc>,
    pub author_name: String,
    pub author_email: String,
    pub manifest_path: String,
    pub name: String,
    pub ecosystem: String,
    pub change_type: String,
    pub requirement: String,
    pub previous_requirement: Option<String>,
    pub dependency_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySnapshotInsert {
    pub commit_id: i64,
    pub manifest_id: i64,
    pub name: String,
    pub ecosystem: String,
    pub requirement: String,
    pub dependency_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySnapshotRow {
    pub manifest_path: String,
    pub manifest_kind: String,
    pub name: String,
    pub ecosystem: String,
    pub requirement: String,
    pub dependency_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub branches: i64,
    pub commits: i64,
    pub change_bearing_commits: i64,
    pub manifests: i64,
    pub dependency_changes: i64,
    pub dependency_snapshots: i64,
}
