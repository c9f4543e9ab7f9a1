use std::collections::HashMap;
use std::path::PathBuf;

use pkgs_adapters::AdapterRegistry;
use pkgs_core::{ChangeType, DependencyType, EcosystemFilter, ParsedManifest, PathStatus};

use crate::blob_cache::BlobCache;
use crate::quick_filter::QuickFilter;
use crate::types::{CommitAnalysis, DependencyChangeRow, LiveSnapshot, ManifestRef, SnapshotValue};

/// Supplies blob bytes to the analyzer without coupling it to a specific
/// git transport (seam). The indexer wires this to
/// `pkgs-git`'s batched `cat-file`; tests wire it to an in-memory map.
pub trait BlobSource {
    fn blob_oid_at(&mut self, sha: &str, path: &str) -> Result<Option<String>, String>;
    fn blob_bytes(&mut self, oid: &str) -> Result<Option<Vec<u8>>, String>;
}

/// Everything `analyze_commit` needs that outlives a single commit: the
/// identification registry, the quick filter, the ecosystem allowlist, and
/// the process-lifetime blob cache.
pub struct AnalyzerContext<'a> {
    pub registry: &'a AdapterRegistry,
    pub quick_filter: &'a QuickFilter,
    pub filter: &'a EcosystemFilter,
    pub blob_cache: &'a mut BlobCache,
}

impl<'a> AnalyzerContext<'a> {
    fn is_manifest_path(&self, path: &str) -> bool {
        !self
            .registry
            .identify(&[PathBuf::from(path)])
            .is_empty()
    }

    /// Resolves and parses the blob at `(sha, path)`, `None` when the path
    /// didn't exist at that commit (root's missing parent, a just-added
    /// file) or the object is missing (`BlobMissing`, absorbed).
    fn parse_at(
        &mut self,
        source: &mut dyn BlobSource,
        sha: &str,
        path: &str,
    ) -> Option<Result<ParsedManifest, String>> {
        let oid = match source.blob_oid_at(sha, path) {
            Ok(Some(oid)) => oid,
            Ok(None) => return None,
            Err(err) => return Some(Err(err)),
        };
        let bytes = match source.blob_bytes(&oid) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => return Some(Err(err)),
        };
        self.blob_cache
            .get_or_parse(self.registry, &oid, path, &bytes, self.filter)
    }
}

type NameMap = HashMap<String, (String, DependencyType)>;

fn index_by_name(parsed: &ParsedManifest) -> NameMap {
    parsed
        .dependencies
        .iter()
        .map(|dep| (dep.name.clone(), (dep.requirement.clone(), dep.dependency_type)))
        .collect()
}

/// analyzes one non-merge commit's changed paths against the
/// quick filter, the adapter registry, and the blob cache, mutating
/// `live_snapshot` in place and returning the change rows to persist.
/// Callers must have already excluded merge commits (step 5).
pub fn analyze_commit(
    ctx: &mut AnalyzerContext,
    source: &mut dyn BlobSource,
    commit_sha: &str,
    parent_sha: Option<&str>,
    changed_paths: &[pkgs_core::ChangedPath],
    live_snapshot: &mut LiveSnapshot,
) -> CommitAnalysis {
    let mut analysis = CommitAnalysis::default();

    if !ctx
        .quick_filter
        .any_match(changed_paths.iter().map(|c| c.path.as_str()))
    {
        return analysis;
    }

    for changed in changed_paths {
        let path = changed.path.as_str();
        if !ctx.is_manifest_path(path) {
            continue;
        }
        match changed.status {
            PathStatus::Added => {
                process_added(ctx, source, commit_sha, path, live_snapshot, &mut analysis)
            }
            PathStatus::Modified => process_modified(
                ctx,
                source,
                commit_sha,
                parent_sha,
                path,
                live_snapshot,
                &mut analysis,
            ),
            PathStatus::Deleted => {
                process_deleted(ctx, source, parent_sha, path, live_snapshot, &mut analysis)
            }
        }
    }

    analysis
}

fn process_added(
    ctx: &mut AnalyzerContext,
    source: &mut dyn BlobSource,
    sha: &str,
    path: &str,
    live_snapshot: &mut LiveSnapshot,
    analysis: &mut CommitAnalysis,
) {
    let parsed = match ctx.parse_at(source, sha, path) {
        Some(Ok(parsed)) => parsed,
        Some(Err(err)) => {
            tracing::debug!(commit = sha, path, error = %err, "manifest parse failed, skipping");
            analysis.parse_failures += 1;
            return;
        }
        None => return,
    };

    analysis.manifests_touched.push(ManifestRef {
        path: path.to_string(),
        ecosystem: parsed.ecosystem,
        kind: parsed.kind,
    });

    for dep in &parsed.dependencies {
        analysis.changes.push(DependencyChangeRow {
            manifest_path: path.to_string(),
            ecosystem: parsed.ecosystem,
            name: dep.name.clone(),
            change_type: ChangeType::Added,
            requirement: dep.requirement.clone(),
            previous_requirement: None,
            dependency_type: dep.dependency_type,
        });
        live_snapshot.insert(
            (path.to_string(), dep.name.clone()),
            SnapshotValue {
                ecosystem: parsed.ecosystem,
                kind: parsed.kind,
                requirement: dep.requirement.clone(),
                dependency_type: dep.dependency_type,
            },
        );
    }
}

fn process_modified(
    ctx: &mut AnalyzerContext,
    source: &mut dyn BlobSource,
    sha: &str,
    parent_sha: Option<&str>,
    path: &str,
    live_snapshot: &mut LiveSnapshot,
    analysis: &mut CommitAnalysis,
) {
    let current = match ctx.parse_at(source, sha, path) {
        Some(Ok(parsed)) => parsed,
        Some(Err(err)) => {
            tracing::debug!(commit = sha, path, error = %err, "manifest parse failed, skipping");
            analysis.parse_failures += 1;
            return;
        }
        None => return,
    };

    // Missing parent parse counts as empty before-set ("Missing
    // parent parse counts as empty before-set, equivalent to added file").
    let before: NameMap = match parent_sha.and_then(|parent| ctx.parse_at(source, parent, path)) {
        Some(Ok(parsed)) => index_by_name(&parsed),
        Some(Err(err)) => {
            tracing::debug!(commit = sha, path, error = %err, "parent manifest parse failed, treating as empty");
            analysis.parse_failures += 1;
            NameMap::default()
        }
        None => NameMap::default(),
    };
    let after = index_by_name(&current);

    analysis.manifests_touched.push(ManifestRef {
        path: path.to_string(),
        ecosystem: current.ecosystem,
        kind: current.kind,
    });

    for (name, (requirement, dependency_type)) in &before {
        if !after.contains_key(name) {
            analysis.changes.push(DependencyChangeRow {
                manifest_path: path.to_string(),
                ecosystem: current.ecosystem,
                name: name.clone(),
                change_type: ChangeType::Removed,
                requirement: requirement.clone(),
                previous_requirement: Some(requirement.clone()),
                dependency_type: *dependency_type,
            });
            live_snapshot.remove(&(path.to_string(), name.clone()));
        }
    }

    for (name, (requirement, dependency_type)) in &after {
        let key = (path.to_string(), name.clone());
        match before.get(name) {
            None => {
                analysis.changes.push(DependencyChangeRow {
                    manifest_path: path.to_string(),
                    ecosystem: current.ecosystem,
                    name: name.clone(),
                    change_type: ChangeType::Added,
                    requirement: requirement.clone(),
                    previous_requirement: None,
                    dependency_type: *dependency_type,
                });
            }
            Some((previous_requirement, previous_type)) => {
                if previous_requirement != requirement || previous_type != dependency_type {
                    analysis.changes.push(DependencyChangeRow {
                        manifest_path: path.to_string(),
                        ecosystem: current.ecosystem,
                        name: name.clone(),
                        change_type: ChangeType::Modified,
                        requirement: requirement.clone(),
                        previous_requirement: Some(previous_requirement.clone()),
                        dependency_type: *dependency_type,
                    });
                }
            }
        }
        live_snapshot.insert(
            key,
            SnapshotValue {
                ecosystem: current.ecosystem,
                kind: current.kind,
                requirement: requirement.clone(),
                dependency_type: *dependency_type,
            },
        );
    }
}

fn process_deleted(
    ctx: &mut AnalyzerContext,
    source: &mut dyn BlobSource,
    parent_sha: Option<&str>,
    path: &str,
    live_snapshot: &mut LiveSnapshot,
    analysis: &mut CommitAnalysis,
) {
    let Some(parent_sha) = parent_sha else {
        return;
    };
    let parsed = match ctx.parse_at(source, parent_sha, path) {
        Some(Ok(parsed)) => parsed,
        Some(Err(err)) => {
            tracing::debug!(commit = parent_sha, path, error = %err, "manifest parse failed, skipping");
            analysis.parse_failures += 1;
            return;
        }
        None => return,
    };

    analysis.manifests_touched.push(ManifestRef {
        path: path.to_string(),
        ecosystem: parsed.ecosystem,
        kind: parsed.kind,
    });

    for dep in &parsed.dependencies {
        analysis.changes.push(DependencyChangeRow {
            manifest_path: path.to_string(),
            ecosystem: parsed.ecosystem,
            name: dep.name.clone(),
            change_type: ChangeType::Removed,
            requirement: dep.requirement.clone(),
            previous_requirement: Some(dep.requirement.clone()),
            dependency_type: dep.dependency_type,
        });
        live_snapshot.remove(&(path.to_string(), dep.name.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgs_core::{ChangedPath, Ecosystem, ManifestKind};
    use std::collections::HashMap as StdHashMap;

    #[derive(Default)]
    struct FakeBlobSource {
        // (sha, path) -> oid
        oids: StdHashMap<(String, String), String>,
        // oid -> bytes
        blobs: StdHashMap<String, Vec<u8>>,
    }

    impl FakeBlobSource {
        fn put(&mut self, sha: &str, path: &str, oid: &str, bytes: &[u8]) {
            self.oids
                .insert((sha.to_string(), path.to_string()), oid.to_string());
            self.blobs.insert(oid.to_string(), bytes.to_vec());
        }
    }

    impl BlobSource for FakeBlobSource {
        fn blob_oid_at(&mut self, sha: &str, path: &str) -> Result<Option<String>, String> {
            Ok(self.oids.get(&(sha.to_string(), path.to_string())).cloned())
        }

        fn blob_bytes(&mut self, oid: &str) -> Result<Option<Vec<u8>>, String> {
            Ok(self.blobs.get(oid).cloned())
        }
    }

    fn changed(path: &str, status: PathStatus) -> ChangedPath {
        ChangedPath {
            path: path.to_string(),
            status,
        }
    }

    #[test]
    fn added_manifest_emits_one_change_per_dependency() {
        let registry = AdapterRegistry::default_registry();
        let quick_filter = QuickFilter::new();
        let filter = EcosystemFilter::allow_all();
        let mut blob_cache = BlobCache::new();
        let mut ctx = AnalyzerContext {
            registry: &registry,
            quick_filter: &quick_filter,
            filter: &filter,
            blob_cache: &mut blob_cache,
        };
        let mut source = FakeBlobSource::default();
        source.put(
            "sha1",
            "Gemfile",
            "oid1",
            b"gem \"rails\", \"~> 7.0\"\n",
        );
        let mut snapshot = LiveSnapshot::new();

        let analysis = analyze_commit(
            &mut ctx,
            &mut source,
            "sha1",
            None,
            &[changed("Gemfile", PathStatus::Added)],
            &mut snapshot,
        );

        assert_eq!(analysis.changes.len(), 1);
        assert_eq!(analysis.changes[0].change_type, ChangeType::Added);
        assert_eq!(analysis.changes[0].name, "rails");
        assert_eq!(
            snapshot.get(&("Gemfile".to_string(), "rails".to_string())),
            Some(&SnapshotValue {
                ecosystem: Ecosystem::Rubygems,
                kind: ManifestKind::Manifest,
                requirement: "~> 7.0".to_string(),
                dependency_type: DependencyType::Runtime,
            })
        );
    }

    #[test]
    fn modified_manifest_emits_modified_change_for_changed_requirement() {
        let registry = AdapterRegistry::default_registry();
        let quick_filter = QuickFilter::new();
        let filter = EcosystemFilter::allow_all();
        let mut blob_cache = BlobCache::new();
        let mut ctx = AnalyzerContext {
            registry: &registry,
            quick_filter: &quick_filter,
            filter: &filter,
            blob_cache: &mut blob_cache,
        };
        let mut source = FakeBlobSource::default();
        source.put("sha1", "Gemfile", "oid1", b"gem \"rails\", \"~> 7.0\"\n");
        source.put("sha2", "Gemfile", "oid2", b"gem \"rails\", \"~> 7.1\"\n");
        let mut snapshot = LiveSnapshot::new();
        snapshot.insert(
            ("Gemfile".to_string(), "rails".to_string()),
            SnapshotValue {
                ecosystem: Ecosystem::Rubygems,
                kind: ManifestKind::Manifest,
                requirement: "~> 7.0".to_string(),
                dependency_type: DependencyType::Runtime,
            },
        );

        let analysis = analyze_commit(
            &mut ctx,
            &mut source,
            "sha2",
            Some("sha1"),
            &[changed("Gemfile", PathStatus::Modified)],
            &mut snapshot,
        );

        assert_eq!(analysis.changes.len(), 1);
        assert_eq!(analysis.changes[0].change_type, ChangeType::Modified);
        assert_eq!(analysis.changes[0].previous_requirement.as_deref(), Some("~> 7.0"));
        assert_eq!(analysis.changes[0].requirement, "~> 7.1");
    }

    #[test]
    fn deleted_manifest_emits_removed_for_every_prior_dependency() {
        let registry = AdapterRegistry::default_registry();
        let quick_filter = QuickFilter::new();
        let filter = EcosystemFilter::allow_all();
        let mut blob_cache = BlobCache::new();
        let mut ctx = AnalyzerContext {
            registry: &registry,
            quick_filter: &quick_filter,
            filter: &filter,
            blob_cache: &mut blob_cache,
        };
        let mut source = FakeBlobSource::default();
        source.put("sha1", "Gemfile", "oid1", b"gem \"rails\", \"~> 7.1\"\n");
        let mut snapshot = LiveSnapshot::new();
        snapshot.insert(
            ("Gemfile".to_string(), "rails".to_string()),
            SnapshotValue {
                ecosystem: Ecosystem::Rubygems,
                kind: ManifestKind::Manifest,
                requirement: "~> 7.1".to_string(),
                dependency_type: DependencyType::Runtime,
            },
        );

        let analysis = analyze_commit(
            &mut ctx,
            &mut source,
            "sha2",
            Some("sha1"),
            &[changed("Gemfile", PathStatus::Deleted)],
            &mut snapshot,
        );

        assert_eq!(analysis.changes.len(), 1);
        assert_eq!(analysis.changes[0].change_type, ChangeType::Removed);
        assert_eq!(
            analysis.changes[0].previous_requirement.as_deref(),
            Some("~> 7.1")
        );
        assert!(snapshot.is_empty());
    }

    #[test]
    fn commit_with_no_quick_filter_match_is_skipped_without_touching_blob_source() {
        let registry = AdapterRegistry::default_registry();
        let quick_filter = QuickFilter::new();
        let filter = EcosystemFilter::allow_all();
        let mut blob_cache = BlobCache::new();
        let mut ctx = AnalyzerContext {
            registry: &registry,
            quick_filter: &quick_filter,
            filter: &filter,
            blob_cache: &mut blob_cache,
        };
        let mut source = FakeBlobSource::default();
        let mut snapshot = LiveSnapshot::new();

        let analysis = analyze_commit(
            &mut ctx,
            &mut source,
            "sha1",
            None,
            &[changed("README.md", PathStatus::Added)],
            &mut snapshot,
        );

        assert!(!analysis.has_changes());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn zero_dependency_parse_leaves_unrelated_snapshot_entries_untouched() {
        let registry = AdapterRegistry::default_registry();
        let quick_filter = QuickFilter::new();
        let filter = EcosystemFilter::allow_all();
        let mut blob_cache = BlobCache::new();
        let mut ctx = AnalyzerContext {
            registry: &registry,
            quick_filter: &quick_filter,
            filter: &filter,
            blob_cache: &mut blob_cache,
        };
        let mut source = FakeBlobSource::default();
        source.put("sha1", "Cargo.toml", "oid1", b"[package]\nname = \"x\"\n");
        let mut snapshot = LiveSnapshot::new();
        snapshot.insert(
            ("other/Cargo.toml".to_string(), "serde".to_string()),
            SnapshotValue {
                ecosystem: Ecosystem::Cargo,
                kind: ManifestKind::Manifest,
                requirement: "1".to_string(),
                dependency_type: DependencyType::Runtime,
            },
        );

        let analysis = analyze_commit(
            &mut ctx,
            &mut source,
            "sha1",
            None,
            &[changed("Cargo.toml", PathStatus::Added)],
            &mut snapshot,
        );

        assert!(!analysis.has_changes());
        assert_eq!(snapshot.len(), 1);
    }
}
