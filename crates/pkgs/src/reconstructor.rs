//! Point-in-time dependency reconstruction:
//! the nearest persisted snapshot at or before a commit, replayed forward
//! through the intervening change rows.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pkgs_core::{DependencyType, Ecosystem, LiveDependency, ManifestKind};
use pkgs_store::{CommitRow, SqliteStore};

use crate::error::QueryError;

/// Loads the base snapshot (if any), then replays every change strictly
/// after it up to and including `commit_id`, in `(committed_at, commit.id)`
/// order so the result never depends on which valid snapshot happened to be
/// nearest.
pub fn deps_at_sha(
    store: &SqliteStore,
    commit_id: i64,
    committed_at: DateTime<Utc>,
) -> Result<Vec<LiveDependency>, QueryError> {
    let base = store.latest_snapshot_commit_at(committed_at, commit_id)?;

    let mut live: HashMap<(String, String), LiveDependency> = HashMap::new();
    if let Some(base_commit) = &base {
        for row in store.load_snapshot_rows(base_commit.id)? {
            let dep = snapshot_row_to_live(row)?;
            live.insert((dep.manifest_path.clone(), dep.name.clone()), dep);
        }
    }

    let after = base.as_ref().map(|c| (c.committed_at, c.id));
    let changes = store.load_changes_between(after, committed_at, commit_id)?;
    for change in changes {
        let key = (change.manifest_path.clone(), change.name.clone());
        if change.change_type == "removed" {
            live.remove(&key);
            continue;
        }

        let ecosystem =
            Ecosystem::from_str(&change.ecosystem).map_err(QueryError::BadEcosystem)?;
        let dependency_type = DependencyType::from_str(&change.dependency_type)
            .map_err(QueryError::BadDependencyType)?;
        let kind = live
            .get(&key)
            .map(|dep| dep.kind)
            .map(Ok)
            .unwrap_or_else(|| manifest_kind(store, &change.manifest_path))?;

        live.insert(
            key,
            LiveDependency {
                manifest_path: change.manifest_path,
                ecosystem,
                kind,
                name: change.name,
                requirement: change.requirement,
                dependency_type,
            },
        );
    }

    let mut deps: Vec<LiveDependency> = live.into_values().collect();
    deps.sort_by(|a, b| {
        (a.manifest_path.as_str(), a.name.as_str()).cmp(&(b.manifest_path.as_str(), b.name.as_str()))
    });
    Ok(deps)
}

/// Convenience wrapper over an already-resolved commit row.
pub fn deps_at_commit(store: &SqliteStore, commit: &CommitRow) -> Result<Vec<LiveDependency>, QueryError> {
    deps_at_sha(store, commit.id, commit.committed_at)
}

fn snapshot_row_to_live(row: pkgs_store::DependencySnapshotRow) -> Result<LiveDependency, QueryError> {
    Ok(LiveDependency {
        manifest_path: row.manifest_path,
        ecosystem: Ecosystem::from_str(&row.ecosystem).map_err(QueryError::BadEcosystem)?,
        kind: ManifestKind::from_str(&row.manifest_kind).map_err(QueryError::BadManifestKind)?,
        name: row.name,
        requirement: row.requirement,
        dependency_type: DependencyType::from_str(&row.dependency_type)
            .map_err(QueryError::BadDependencyType)?,
    })
}

/// A change row's first appearance on a (manifest, name) pair the replay
/// has not seen yet carries no manifest kind of its own (`dependency_changes`
/// doesn't store one) — fall back to the `manifests` table, which every
/// change references by construction.
fn manifest_kind(store: &SqliteStore, path: &str) -> Result<ManifestKind, QueryError> {
    let manifest = store
        .manifest_by_path(path)?
        .ok_or_else(|| QueryError::BadManifestKind(format!("no manifest row for path '{path}'")))?;
    ManifestKind::from_str(&manifest.kind).map_err(QueryError::BadManifestKind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pkgs_store::{
        insert_commits_batch, insert_dependency_changes_batch, insert_dependency_snapshots_batch,
        upsert_manifest, CommitInsert, DependencyChangeInsert, DependencySnapshotInsert,
    };

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn commit(store: &mut SqliteStore, sha: &str, at: DateTime<Utc>, has_changes: bool) -> i64 {
        let tx = store.transaction().unwrap();
        let ids = insert_commits_batch(
            &tx,
            &[CommitInsert {
                sha: sha.to_string(),
                message: String::new(),
                author_name: "Alice".to_string(),
                author_email: "alice@example.com".to_string(),
                committed_at: at,
                has_dependency_changes: has_changes,
            }],
        )
        .unwrap();
        tx.commit().unwrap();
        ids[sha]
    }

    #[test]
    fn replays_changes_after_the_nearest_snapshot() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.migrate().unwrap();

        let c1 = commit(&mut store, "c1", ts(100), true);
        let c2 = commit(&mut store, "c2", ts(200), true);

        {
            let tx = store.transaction().unwrap();
            let manifest_id = upsert_manifest(&tx, "Gemfile", "rubygems", "manifest", ts(100)).unwrap();
            insert_dependency_changes_batch(
                &tx,
                &[DependencyChangeInsert {
                    commit_id: c1,
                    manifest_id,
                    name: "rails".to_string(),
                    ecosystem: "rubygems".to_string(),
                    change_type: "added".to_string(),
                    requirement: "~> 7.0".to_string(),
                    previous_requirement: None,
                    dependency_type: "runtime".to_string(),
                }],
            )
            .unwrap();
            insert_dependency_snapshots_batch(
                &tx,
                &[DependencySnapshotInsert {
                    commit_id: c1,
                    manifest_id,
                    name: "rails".to_string(),
                    ecosystem: "rubygems".to_string(),
                    requirement: "~> 7.0".to_string(),
                    dependency_type: "runtime".to_string(),
                }],
            )
            .unwrap();
            insert_dependency_changes_batch(
                &tx,
                &[DependencyChangeInsert {
                    commit_id: c2,
                    manifest_id,
                    name: "rails".to_string(),
                    ecosystem: "rubygems".to_string(),
                    change_type: "modified".to_string(),
                    requirement: "~> 7.1".to_string(),
                    previous_requirement: Some("~> 7.0".to_string()),
                    dependency_type: "runtime".to_string(),
                }],
            )
            .unwrap();
            tx.commit().unwrap();
        }

        let deps = deps_at_sha(&store, c2, ts(200)).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].requirement, "~> 7.1");

        let deps_at_c1 = deps_at_sha(&store, c1, ts(100)).unwrap();
        assert_eq!(deps_at_c1.len(), 1);
        assert_eq!(deps_at_c1[0].requirement, "~> 7.0");
    }

    #[test]
    fn removal_drops_the_dependency() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.migrate().unwrap();

        let c1 = commit(&mut store, "c1", ts(100), true);
        let c2 = commit(&mut store, "c2", ts(200), true);

        let tx = store.transaction().unwrap();
        let manifest_id = upsert_manifest(&tx, "package.json", "npm", "manifest", ts(100)).unwrap();
        insert_dependency_changes_batch(
            &tx,
            &[DependencyChangeInsert {
                commit_id: c1,
                manifest_id,
                name: "lodash".to_string(),
                ecosystem: "npm".to_string(),
                change_type: "added".to_string(),
                requirement: "^4.0.0".to_string(),
                previous_requirement: None,
                dependency_type: "runtime".to_string(),
            }],
        )
        .unwrap();
        insert_dependency_snapshots_batch(
            &tx,
            &[DependencySnapshotInsert {
                commit_id: c1,
                manifest_id,
                name: "lodash".to_string(),
                ecosystem: "npm".to_string(),
                requirement: "^4.0.0".to_string(),
                dependency_type: "runtime".to_string(),
            }],
        )
        .unwrap();
        insert_dependency_changes_batch(
            &tx,
            &[DependencyChangeInsert {
                commit_id: c2,
                manifest_id,
                name: "lodash".to_string(),
                ecosystem: "npm".to_string(),
                change_type: "removed".to_string(),
                requirement: String::new(),
                previous_requirement: Some("^4.0.0".to_string()),
                dependency_type: "runtime".to_string(),
            }],
        )
        .unwrap();
        tx.commit().unwrap();

        assert_eq!(deps_at_sha(&store, c1, ts(100)).unwrap().len(), 1);
        assert!(deps_at_sha(&store, c2, ts(200)).unwrap().is_empty());
    }
}
