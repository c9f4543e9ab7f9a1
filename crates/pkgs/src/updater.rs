use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use pkgs_adapters::AdapterRegistry;
use pkgs_analyzer::{analyze_commit, AnalyzerContext, BlobCache, LiveSnapshot, QuickFilter};
use pkgs_core::RuntimeConfig;
use pkgs_git::{rev_parse, walk_since, GitCli, RepoHandle};
use pkgs_progress::{Phase, ProgressEvent, ProgressSink};
use pkgs_store::{
    insert_branch_commits_batch, insert_commits_batch, insert_dependency_changes_batch,
    insert_dependency_snapshots_batch, set_branch_checkpoint, upsert_branch, upsert_manifest,
    CommitInsert, DependencyChangeInsert, DependencySnapshotInsert, SqliteStore,
};

use crate::blob_source::GitBlobSource;
use crate::error::CliError;
use crate::reconstructor::deps_at_sha;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub branch: String,
    pub commits_indexed: usize,
    pub change_bearing_commits: usize,
    pub parse_failures: usize,
}

/// `update(branch?)`: resumes from `last_analyzed_sha`, walking
/// only commits reachable from tip and not from the checkpoint, and
/// commits each one in its own short transaction so interruption never
/// loses more than the in-flight commit.
pub fn update(
    repo: &RepoHandle,
    git: &GitCli,
    store: &mut SqliteStore,
    config: &RuntimeConfig,
    branch_name: &str,
    cancel: &Arc<AtomicBool>,
    sink: &mut dyn ProgressSink,
) -> Result<UpdateSummary, CliError> {
    store.check_schema_version("git-pkgs")?;

    let tip = rev_parse(repo, branch_name, git)?;
    let existing = store.branch(branch_name)?;
    let checkpoint = existing
        .as_ref()
        .map(|b| b.last_analyzed_sha.clone())
        .filter(|sha| !sha.is_empty());

    let commits = walk_since(repo, checkpoint.as_deref(), &tip.sha, git)?;
    let total = commits.len();

    let branch_id = {
        let tx = store.transaction()?;
        let id = upsert_branch(&tx, branch_name, Utc::now())?;
        tx.commit()?;
        id
    };

    let mut live_snapshot: LiveSnapshot = match &checkpoint {
        Some(sha) => seed_snapshot(store, sha)?,
        None => LiveSnapshot::new(),
    };

    let registry = AdapterRegistry::default_registry();
    let quick_filter = QuickFilter::new();
    let mut blob_cache = BlobCache::new();
    let mut blob_source = GitBlobSource::new(repo, git)?;

    let mut commits_indexed = 0usize;
    let mut change_bearing_commits = 0usize;
    let mut parse_failures = 0usize;
    let mut position = store.row_counts()?.commits; // append after whatever already exists

    for commit in &commits {
        if cancel.load(Ordering::SeqCst) {
            sink.finish();
            return Err(CliError::Cancelled);
        }

        let parent_sha = commit.parents.first().map(|s| s.as_str());
        let changed_paths = if commit.is_merge() {
            Vec::new()
        } else {
            let paths = pkgs_git::changed_paths(repo, commit, git)?;
            pkgs_core::filter_ignored_paths(paths, &config.ignored_dirs, &config.ignored_files)
        };

        let analysis = if commit.is_merge() {
            pkgs_analyzer::CommitAnalysis::default()
        } else {
            let mut ctx = AnalyzerContext {
                registry: &registry,
                quick_filter: &quick_filter,
                filter: &config.ecosystems,
                blob_cache: &mut blob_cache,
            };
            analyze_commit(
                &mut ctx,
                &mut blob_source,
                &commit.sha,
                parent_sha,
                &changed_paths,
                &mut live_snapshot,
            )
        };
        let has_changes = analysis.has_changes();
        parse_failures += analysis.parse_failures;
        if has_changes {
            change_bearing_commits += 1;
        }

        let now = Utc::now();
        let tx = store.transaction()?;
        let commit_id = insert_commits_batch(
            &tx,
            &[CommitInsert {
                sha: commit.sha.clone(),
                message: commit.message.clone(),
                author_name: commit.author_name.clone(),
                author_email: commit.author_email.clone(),
                committed_at: commit.committed_at,
                has_dependency_changes: has_changes,
            }],
        )?[&commit.sha];
        insert_branch_commits_batch(&tx, branch_id, &[commit_id], position)?;
        position += 1;

        let mut change_rows = Vec::new();
        for manifest_ref in &analysis.manifests_touched {
            upsert_manifest(
                &tx,
                &manifest_ref.path,
                manifest_ref.ecosystem.as_str(),
                manifest_ref.kind.as_str(),
                now,
            )?;
        }
        for change in &analysis.changes {
            let manifest_id = upsert_manifest(
                &tx,
                &change.manifest_path,
                change.ecosystem.as_str(),
                manifest_kind_for(&analysis, &change.manifest_path),
                now,
            )?;
            change_rows.push(DependencyChangeInsert {
                commit_id,
                manifest_id,
                name: change.name.clone(),
                ecosystem: change.ecosystem.as_str().to_string(),
                change_type: change.change_type.as_str().to_string(),
                requirement: change.requirement.clone(),
                previous_requirement: change.previous_requirement.clone(),
                dependency_type: change.dependency_type.as_str().to_string(),
            });
        }
        insert_dependency_changes_batch(&tx, &change_rows)?;

        if has_changes {
            let mut snapshot_rows = Vec::new();
            for ((path, name), value) in live_snapshot.iter() {
                let manifest_id = upsert_manifest(
                    &tx,
                    path,
                    value.ecosystem.as_str(),
                    value.kind.as_str(),
                    now,
                )?;
                snapshot_rows.push(DependencySnapshotInsert {
                    commit_id,
                    manifest_id,
                    name: name.clone(),
                    ecosystem: value.ecosystem.as_str().to_string(),
                    requirement: value.requirement.clone(),
                    dependency_type: value.dependency_type.as_str().to_string(),
                });
            }
            insert_dependency_snapshots_batch(&tx, &snapshot_rows)?;
        }

        set_branch_checkpoint(&tx, branch_id, &commit.sha, now)?;
        tx.commit().map_err(pkgs_store::StoreError::from)?;

        commits_indexed += 1;
        sink.report(&ProgressEvent {
            phase: Phase::Indexing,
            commits_done: commits_indexed,
            commits_total: total,
            change_bearing_commits,
            message: None,
        });
    }

    sink.finish();
    Ok(UpdateSummary {
        branch: branch_name.to_string(),
        commits_indexed,
        change_bearing_commits,
    })
}

/// `lazy_materialize(sha)`: used by ad-hoc `diff`/`show` paths
/// for refs outside any tracked branch. Inserts a metadata-only `Commit`
/// row (`has_dependency_changes = false`) if absent; a later `update` that
/// walks over this sha on a tracked branch augments it in place.
pub fn lazy_materialize(
    repo: &RepoHandle,
    git: &GitCli,
    store: &mut SqliteStore,
    reference: &str,
) -> Result<String, CliError> {
    let resolved = rev_parse(repo, reference, git)?;
    if store.find_commit_by_sha(&resolved.sha)?.is_some() {
        return Ok(resolved.sha);
    }

    let meta = pkgs_git::commit_meta(repo, &resolved.sha, git)?;

    let tx = store.transaction()?;
    insert_commits_batch(
        &tx,
        &[CommitInsert {
            sha: meta.sha.clone(),
            message: meta.message.clone(),
            author_name: meta.author_name.clone(),
            author_email: meta.author_email.clone(),
            committed_at: meta.committed_at,
            has_dependency_changes: false,
        }],
    )?;
    tx.commit().map_err(pkgs_store::StoreError::from)?;

    Ok(meta.sha)
}

fn seed_snapshot(store: &SqliteStore, checkpoint_sha: &str) -> Result<LiveSnapshot, CliError> {
    let commit = store
        .find_commit_by_sha(checkpoint_sha)?
        .ok_or_else(|| CliError::Other(format!("checkpoint commit {checkpoint_sha} missing from store")))?;
    let deps = deps_at_sha(store, commit.id, commit.committed_at)?;
    let mut snapshot = LiveSnapshot::new();
    for dep in deps {
        snapshot.insert(
            (dep.manifest_path, dep.name),
            pkgs_analyzer::SnapshotValue {
                ecosystem: dep.ecosystem,
                kind: dep.kind,
                requirement: dep.requirement,
                dependency_type: dep.dependency_type,
            },
        );
    }
    Ok(snapshot)
}

fn manifest_kind_for<'a>(
    analysis: &'a pkgs_analyzer::CommitAnalysis,
    path: &str,
) -> &'a str {
    analysis
        .manifests_touched
        .iter()
        .find(|m| m.path == path)
        .map(|m| m.kind.as_str())
        .unwrap_or("manifest")
}
