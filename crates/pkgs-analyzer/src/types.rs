use std::collections::HashMap;

use pkgs_core::{ChangeType, DependencyType, Ecosystem, ManifestKind};

/// `(manifest_path, name)` — the fully-qualifying key for both the live
/// snapshot and the persisted `dependency_snapshots` table.
pub type SnapshotKey = (String, String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotValue {
    pub ecosystem: Ecosystem,
    pub kind: ManifestKind,
    pub requirement: String,
    pub dependency_type: DependencyType,
}

/// The indexer's hot mutable mapping of live dependency state while walking
/// history. Not a persisted entity; write-only into `dependency_snapshots`.
pub type LiveSnapshot = HashMap<SnapshotKey, SnapshotValue>;

/// One `DependencyChange` event, pre-insertion (no commit/manifest surrogate
/// ids assigned yet — the store assigns those at insert time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChangeRow {
    pub manifest_path: String,
    pub ecosystem: Ecosystem,
    pub name: String,
    pub change_type: ChangeType,
    pub requirement: String,
    pub previous_requirement: Option<String>,
    pub dependency_type: DependencyType,
}

/// A manifest path observed in this commit, for `Manifest` upsert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestRef {
    pub path: String,
    pub ecosystem: Ecosystem,
    pub kind: ManifestKind,
}

/// The analyzer's output for one non-merge commit whose changed paths
/// include at least one identified manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitAnalysis {
    pub changes: Vec<DependencyChangeRow>,
    pub manifests_touched: Vec<ManifestRef>,
    /// Manifests that matched the quick filter and identification but
    /// failed to parse (`ParseFailure`) or whose blob was missing
    /// (`BlobMissing`). Absorbed locally per spec — never aborts the
    /// commit — but counted so a run can report "N manifests failed to
    /// parse, skipped" instead of silently dropping them.
    pub parse_failures: usize,
}

impl CommitAnalysis {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}
