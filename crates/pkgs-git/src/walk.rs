use chrono::{DateTime, Utc};

use crate::command::GitCli;
use crate::error::GitError;
use crate::repo::RepoHandle;
use pkgs_core::{ChangedPath, PathStatus};

const FIELD_SEP: &str = "\x1f";
const RECORD_SEP: &str = "\x1e";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub sha: String,
    pub parents: Vec<String>,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub committed_at: DateTime<Utc>,
}

impl CommitMeta {
    /// `is_merge`.
    pub fn is_merge(&self) -> bool {
        self.parents.len() >= 2
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Walks the full history reachable from `tip`, parent-first: oldest commit
/// first, each commit's parents emitted before it.
/// This is a one-shot materialization — re-invoke to walk again.
pub fn walk(repo: &RepoHandle, tip: &str, git: &GitCli) -> Result<Vec<CommitMeta>, GitError> {
    walk_since(repo, None, tip, git)
}

/// `walk` restricted to commits reachable from `tip` but not from `since`
///.
/// `since = None` behaves exactly like `walk`.
pub fn walk_since(
    repo: &RepoHandle,
    since: Option<&str>,
    tip: &str,
    git: &GitCli,
) -> Result<Vec<CommitMeta>, GitError> {
    let format = format!(
        "%H{FIELD_SEP}%P{FIELD_SEP}%an{FIELD_SEP}%ae{FIELD_SEP}%cI{FIELD_SEP}%B{RECORD_SEP}"
    );
    let pretty_arg = format!("--pretty=format:{format}");
    let range = match since {
        Some(since) if !since.is_empty() => format!("{since}..{tip}"),
        _ => tip.to_string(),
    };
    let output = git.run(
        &repo.root,
        ["rev-list", "--reverse", "--topo-order", &pretty_arg, &range],
    )?;

    parse_rev_list_output(&output.stdout)
}

fn parse_rev_list_output(raw: &str) -> Result<Vec<CommitMeta>, GitError> {
    let mut commits = Vec::new();
    for record in raw.split(RECORD_SEP) {
        let record = record.trim_start_matches('\n');
        if record.trim().is_empty() {
            continue;
        }
        let mut fields = record.splitn(6, FIELD_SEP);
        let sha = fields
            .next()
            .ok_or_else(|| parse_err("missing sha field"))?
            .to_string();
        let parents_raw = fields.next().unwrap_or_default();
        let parents = parents_raw
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();
        let author_name = fields.next().unwrap_or_default().to_string();
        let author_email = fields.next().unwrap_or_default().to_string();
        let committed_at_raw = fields.next().unwrap_or_default();
        let committed_at = DateTime::parse_from_rfc3339(committed_at_raw)
            .map_err(|_| parse_err("unparseable committed_at timestamp"))?
            .with_timezone(&Utc);
        let message = fields.next().unwrap_or_default().trim_end().to_string();

        commits.push(CommitMeta {
            sha,
            parents,
            message,
            author_name,
            author_email,
            committed_at,
        });
    }
    Ok(commits)
}

/// Fetches metadata for exactly one commit without walking any ancestry —
/// the cheap path for lazy materialization, where a caller only needs one
/// row and has no interest in the commit's history.
pub fn commit_meta(repo: &RepoHandle, sha: &str, git: &GitCli) -> Result<CommitMeta, GitError> {
    let format = format!(
        "%H{FIELD_SEP}%P{FIELD_SEP}%an{FIELD_SEP}%ae{FIELD_SEP}%cI{FIELD_SEP}%B{RECORD_SEP}"
    );
    let pretty_arg = format!("--pretty=format:{format}");
    let output = git.run(&repo.root, ["log", "-1", &pretty_arg, sha])?;
    let commits = parse_rev_list_output(&output.stdout)?;
    commits.into_iter().next().ok_or_else(|| parse_err("commit metadata not found"))
}

fn parse_err(context: &str) -> GitError {
    GitError::Parse {
        context: context.to_string(),
    }
}

/// `changed_paths`: status relative to first parent, root commits
/// treated as all-added.
pub fn changed_paths(
    repo: &RepoHandle,
    commit: &CommitMeta,
    git: &GitCli,
) -> Result<Vec<ChangedPath>, GitError> {
    let output = if commit.is_root() {
        git.run(
            &repo.root,
            [
                "show",
                "--name-status",
                "--root",
                "--format=",
                "--no-renames",
                &commit.sha,
            ],
        )?
    } else {
        git.run(
            &repo.root,
            [
                "diff-tree",
                "--no-commit-id",
                "--name-status",
                "-r",
                "-M",
                &commit.sha,
            ],
        )?
    };

    parse_name_status(&output.stdout, commit.is_root())
}

fn parse_name_status(raw: &str, force_added: bool) -> Result<Vec<ChangedPath>, GitError> {
    let mut out = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split('\t');
        let code = parts
            .next()
            .ok_or_else(|| parse_err("missing status code in name-status line"))?;
        let status = if force_added {
            PathStatus::Added
        } else if code.starts_with('A') {
            PathStatus::Added
        } else if code.starts_with('D') {
            PathStatus::Deleted
        } else if code.starts_with('M') || code.starts_with('T') {
            PathStatus::Modified
        } else if code.starts_with('R') || code.starts_with('C') {
            // rename/copy: the old path is dropped, the new path modified.
            // diff-tree with -M prints old-path then new-path; take the new.
            let _old = parts.next();
            PathStatus::Modified
        } else {
            PathStatus::Modified
        };
        let path = match parts.next() {
            Some(p) => p.to_string(),
            None => continue,
        };
        out.push(ChangedPath { path, status });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rev_list_output_handles_two_commits() {
        let raw = format!(
            "sha1{FIELD_SEP}{FIELD_SEP}Alice{FIELD_SEP}a@x{FIELD_SEP}2024-01-01T00:00:00+00:00{FIELD_SEP}root commit{RECORD_SEP}\nsha2{FIELD_SEP}sha1{FIELD_SEP}Bob{FIELD_SEP}b@x{FIELD_SEP}2024-01-02T00:00:00+00:00{FIELD_SEP}second{RECORD_SEP}"
        );
        let commits = parse_rev_list_output(&raw).unwrap();
        assert_eq!(commits.len(), 2);
        assert!(commits[0].is_root());
        assert!(!commits[1].is_root());
        assert_eq!(commits[1].parents, vec!["sha1".to_string()]);
    }

    #[test]
    fn parse_name_status_maps_codes() {
        let raw = "A\tGemfile\nM\tpackage.json\nD\told.txt\n";
        let paths = parse_name_status(raw, false).unwrap();
        assert_eq!(paths[0].status, PathStatus::Added);
        assert_eq!(paths[1].status, PathStatus::Modified);
        assert_eq!(paths[2].status, PathStatus::Deleted);
    }

    #[test]
    fn parse_name_status_forces_added_for_root_commit() {
        let raw = "A\tGemfile\n";
        let paths = parse_name_status(raw, true).unwrap();
        assert_eq!(paths[0].status, PathStatus::Added);
    }

    #[test]
    fn is_merge_requires_at_least_two_parents() {
        let commit = CommitMeta {
            sha: "x".into(),
            parents: vec!["a".into(), "b".into()],
            message: String::new(),
            author_name: String::new(),
            author_email: String::new(),
            committed_at: Utc::now(),
        };
        assert!(commit.is_merge());
    }
}
