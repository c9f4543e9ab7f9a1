use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use pkgs_adapters::AdapterRegistry;
use pkgs_analyzer::{analyze_commit, AnalyzerContext, BlobCache, CommitAnalysis, LiveSnapshot, QuickFilter};
use pkgs_core::RuntimeConfig;
use pkgs_git::{prefetch_changed_paths, rev_parse, walk_since, CommitMeta, GitCli, RepoHandle};
use pkgs_progress::{Phase, ProgressEvent, ProgressSink};
use pkgs_store::{
    insert_branch_commits_batch, insert_commits_batch, insert_dependency_changes_batch,
    insert_dependency_snapshots_batch, set_branch_checkpoint, upsert_branch, upsert_manifest,
    CommitInsert, DependencyChangeInsert, DependencySnapshotInsert, SqliteStore,
};

use crate::blob_source::GitBlobSource;
use crate::error::CliError;

/// Summary handed back to the CLI layer for `init`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub branch: String,
    pub tip_sha: String,
    pub commits_indexed: usize,
    pub change_bearing_commits: usize,
    pub parse_failures: usize,
}

/// One walked commit buffered between batch flushes, together with its
/// already-computed analysis. Nothing here references a surrogate id —
/// those are only assigned once a batch is about to be inserted.
struct PendingCommit {
    meta: CommitMeta,
    analysis: CommitAnalysis,
    snapshot_rows: Option<Vec<(String, String, pkgs_analyzer::SnapshotValue)>>,
}

/// `init(branch?)`: resolves the branch, (re)creates the schema,
/// walks full history, analyzes every non-merge commit against a running
/// live snapshot, and flushes buffered rows every `batch_size` commits.
#[allow(clippy::too_many_arguments)]
pub fn init(
    repo: &RepoHandle,
    git: &GitCli,
    store: &mut SqliteStore,
    config: &RuntimeConfig,
    branch_name: &str,
    since: Option<&str>,
    force: bool,
    cancel: &Arc<AtomicBool>,
    sink: &mut dyn ProgressSink,
) -> Result<IndexSummary, CliError> {
    if force {
        store.wipe()?;
    } else {
        store.migrate()?;
    }

    let tip = rev_parse(repo, branch_name, git)?;
    let since_sha = since
        .map(|since_ref| rev_parse(repo, since_ref, git))
        .transpose()?
        .map(|resolved| resolved.sha);
    let commits = walk_since(repo, since_sha.as_deref(), &tip.sha, git)?;

    let total = commits.len();
    store.begin_bulk_load()?;

    let prefetch = prefetch_changed_paths(repo, &commits, config.threads, git);
    let registry = AdapterRegistry::default_registry();
    let quick_filter = QuickFilter::new();
    let mut blob_cache = BlobCache::new();
    let mut blob_source = GitBlobSource::new(repo, git)?;
    let mut live_snapshot: LiveSnapshot = LiveSnapshot::new();
    let mut manifest_ids: HashMap<String, i64> = HashMap::new();

    let branch_id = {
        let tx = store.transaction()?;
        let id = upsert_branch(&tx, branch_name, Utc::now())?;
        tx.commit()?;
        id
    };

    let mut pending: Vec<PendingCommit> = Vec::new();
    let mut position: i64 = 0;
    let mut change_bearing_since_snapshot = 0usize;
    let mut commits_indexed = 0usize;
    let mut change_bearing_commits = 0usize;
    let mut parse_failures = 0usize;

    for (idx, commit) in commits.iter().enumerate() {
        let parent_sha = commit.parents.first().map(|s| s.as_str());
        let changed_paths = match prefetch.get(&commit.sha) {
            Some(Ok(paths)) => pkgs_core::filter_ignored_paths(
                paths.clone(),
                &config.ignored_dirs,
                &config.ignored_files,
            ),
            Some(Err(message)) => return Err(CliError::Other(message.clone())),
            None => Vec::new(),
        };

        let analysis = if commit.is_merge() {
            CommitAnalysis::default()
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
            change_bearing_since_snapshot += 1;
        }

        let is_tip = idx + 1 == total;
        let periodic_snapshot =
            has_changes && change_bearing_since_snapshot >= config.snapshot_interval;
        let take_snapshot = periodic_snapshot || (is_tip && has_changes);
        if periodic_snapshot {
            change_bearing_since_snapshot = 0;
        }

        let snapshot_rows = take_snapshot.then(|| {
            live_snapshot
                .iter()
                .map(|((path, name), value)| (path.clone(), name.clone(), value.clone()))
                .collect()
        });

        pending.push(PendingCommit {
            meta: commit.clone(),
            analysis,
            snapshot_rows,
        });
        commits_indexed += 1;

        if pending.len() >= config.batch_size || is_tip {
            if cancel.load(Ordering::SeqCst) {
                return Err(CliError::Cancelled);
            }
            flush_batch(store, branch_id, &mut manifest_ids, &mut position, &mut pending)?;
            sink.report(&ProgressEvent {
                phase: Phase::Indexing,
                commits_done: commits_indexed,
                commits_total: total,
                change_bearing_commits,
                message: None,
            });
        }
    }

    store.end_bulk_load()?;
    sink.finish();
    if parse_failures > 0 {
        tracing::debug!(parse_failures, "manifests failed to parse during this run, skipped");
    }

    Ok(IndexSummary {
        branch: branch_name.to_string(),
        tip_sha: tip.sha,
        commits_indexed,
        change_bearing_commits,
        parse_failures,
    })
}

/// Flushes every buffered commit in `pending` inside one transaction:
/// commits, then branch positions, then manifest upserts (deduplicated
/// across the whole run via `manifest_ids`), then change/snapshot rows,
/// then the branch checkpoint — all in one transaction, so a kill mid-flush
/// leaves the store exactly where it was before the flush started.
fn flush_batch(
    store: &mut SqliteStore,
    branch_id: i64,
    manifest_ids: &mut HashMap<String, i64>,
    position: &mut i64,
    pending: &mut Vec<PendingCommit>,
) -> Result<(), CliError> {
    if pending.is_empty() {
        return Ok(());
    }
    let now = Utc::now();
    let tx = store.transaction()?;

    let commit_rows: Vec<CommitInsert> = pending
        .iter()
        .map(|p| CommitInsert {
            sha: p.meta.sha.clone(),
            message: p.meta.message.clone(),
            author_name: p.meta.author_name.clone(),
            author_email: p.meta.author_email.clone(),
            committed_at: p.meta.committed_at,
            has_dependency_changes: p.analysis.has_changes(),
        })
        .collect();
    let commit_ids = insert_commits_batch(&tx, &commit_rows)?;

    let ordered_ids: Vec<i64> = pending.iter().map(|p| commit_ids[&p.meta.sha]).collect();
    insert_branch_commits_batch(&tx, branch_id, &ordered_ids, *position)?;
    *position += ordered_ids.len() as i64;

    for p in pending.iter() {
        for manifest_ref in &p.analysis.manifests_touched {
            if !manifest_ids.contains_key(&manifest_ref.path) {
                let id = upsert_manifest(
                    &tx,
                    &manifest_ref.path,
                    manifest_ref.ecosystem.as_str(),
                    manifest_ref.kind.as_str(),
                    now,
                )?;
                manifest_ids.insert(manifest_ref.path.clone(), id);
            }
        }
    }

    let mut change_rows = Vec::new();
    let mut snapshot_rows = Vec::new();
    let mut last_sha = String::new();
    for p in pending.iter() {
        let commit_id = commit_ids[&p.meta.sha];
        last_sha = p.meta.sha.clone();
        for change in &p.analysis.changes {
            let manifest_id = manifest_ids[&change.manifest_path];
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
        if let Some(rows) = &p.snapshot_rows {
            for (path, name, value) in rows {
                let manifest_id = manifest_ids[path];
                snapshot_rows.push(DependencySnapshotInsert {
                    commit_id,
                    manifest_id,
                    name: name.clone(),
                    ecosystem: value.ecosystem.as_str().to_string(),
                    requirement: value.requirement.clone(),
                    dependency_type: value.dependency_type.as_str().to_string(),
                });
            }
        }
    }
    insert_dependency_changes_batch(&tx, &change_rows)?;
    insert_dependency_snapshots_batch(&tx, &snapshot_rows)?;

    if !last_sha.is_empty() {
        set_branch_checkpoint(&tx, branch_id, &last_sha, now)?;
    }

    tx.commit().map_err(pkgs_store::StoreError::from)?;
    pending.clear();
    Ok(())
}
