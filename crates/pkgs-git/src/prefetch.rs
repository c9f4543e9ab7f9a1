use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use pkgs_core::ChangedPath;

use crate::command::GitCli;
use crate::error::GitError;
use crate::repo::RepoHandle;
use crate::walk::{changed_paths, CommitMeta};

/// Below this commit count, prefetching runs serially regardless of the
/// configured thread count.
pub const PREFETCH_THREAD_THRESHOLD: usize = pkgs_core::config::PREFETCH_THREAD_THRESHOLD;

pub type PrefetchMap = HashMap<String, Result<Vec<ChangedPath>, String>>;

/// `prefetch_changed_paths`: warms a `commit_id -> changed_paths`
/// map ahead of the analyzer. The analyzer still consumes commits in walker
/// order; this only precomputes diffs so the serial pass doesn't pay git's
/// subprocess latency one commit at a time. `threads <= 1` or a commit
/// count below `PREFETCH_THREAD_THRESHOLD` runs serially in the caller's
/// thread (worker-pool spawn overhead would dominate otherwise).
pub fn prefetch_changed_paths(
    repo: &RepoHandle,
    commits: &[CommitMeta],
    threads: usize,
    git: &GitCli,
) -> PrefetchMap {
    if threads <= 1 || commits.len() < PREFETCH_THREAD_THRESHOLD {
        return prefetch_serial(repo, commits, git);
    }
    prefetch_parallel(repo, commits, threads, git)
}

fn prefetch_serial(repo: &RepoHandle, commits: &[CommitMeta], git: &GitCli) -> PrefetchMap {
    let mut map = HashMap::with_capacity(commits.len());
    for commit in commits {
        let result = changed_paths(repo, commit, git).map_err(|e| e.to_string());
        map.insert(commit.sha.clone(), result);
    }
    map
}

fn prefetch_parallel(
    repo: &RepoHandle,
    commits: &[CommitMeta],
    threads: usize,
    git: &GitCli,
) -> PrefetchMap {
    let repo = Arc::new(repo.clone());
    let git = Arc::new(git.clone());
    let (tx, rx) = mpsc::channel::<(String, Result<Vec<ChangedPath>, String>)>();

    let chunk_size = commits.len().div_ceil(threads).max(1);
    let mut handles = Vec::new();
    for chunk in commits.chunks(chunk_size) {
        let chunk: Vec<CommitMeta> = chunk.to_vec();
        let repo = Arc::clone(&repo);
        let git = Arc::clone(&git);
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            for commit in &chunk {
                let result = changed_paths(&repo, commit, &git).map_err(|e: GitError| e.to_string());
                let _ = tx.send((commit.sha.clone(), result));
            }
        }));
    }
    drop(tx);

    let mut map = HashMap::with_capacity(commits.len());
    for (sha, result) in rx {
        map.insert(sha, result);
    }

    for handle in handles {
        let _ = handle.join();
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixture_commit(sha: &str) -> CommitMeta {
        CommitMeta {
            sha: sha.to_string(),
            parents: vec![],
            message: "msg".to_string(),
            author_name: "Alice".to_string(),
            author_email: "a@x".to_string(),
            committed_at: Utc::now(),
        }
    }

    #[test]
    fn serial_path_taken_below_threshold() {
        // below-threshold path should never spawn worker threads; this is
        // exercised indirectly through repo I/O in the integration tests,
        // here we only assert the threshold constant is sane.
        assert!(PREFETCH_THREAD_THRESHOLD > 0);
        let _ = fixture_commit("deadbeef");
    }
}
