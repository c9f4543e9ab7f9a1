use std::path::{Path, PathBuf};

use crate::command::GitCli;
use crate::error::GitError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    pub root: PathBuf,
    pub git_dir: PathBuf,
}

/// Opens the repository containing `start_path` (`open`).
pub fn open(start_path: &Path, git: &GitCli) -> Result<RepoHandle, GitError> {
    let inside = match git.run(start_path, ["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => output.stdout.trim().eq("true"),
        Err(GitError::CommandFailed { .. }) => false,
        Err(err) => return Err(err),
    };

    if !inside {
        return Err(GitError::NotARepository {
            path: start_path.to_path_buf(),
        });
    }

    let root_raw = git.run(start_path, ["rev-parse", "--show-toplevel"])?;
    let root = PathBuf::from(root_raw.stdout.trim());

    let git_dir_raw = git.run(&root, ["rev-parse", "--git-dir"])?;
    let git_dir_rel = PathBuf::from(git_dir_raw.stdout.trim());
    let git_dir = if git_dir_rel.is_absolute() {
        git_dir_rel
    } else {
        root.join(git_dir_rel)
    };

    Ok(RepoHandle { root, git_dir })
}

/// Resolves the repository's notion of a default branch: the remote
/// `origin/HEAD` symbolic ref first, then the
/// currently checked-out branch, then a `main`/`master` probe.
pub fn default_branch(repo: &RepoHandle, git: &GitCli) -> Result<String, GitError> {
    if let Ok(output) = git.run(
        &repo.root,
        ["symbolic-ref", "refs/remotes/origin/HEAD"],
    ) {
        if let Some(name) = output.stdout.trim().strip_prefix("refs/remotes/origin/") {
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
    }

    if let Ok(output) = git.run(&repo.root, ["branch", "--show-current"]) {
        let name = output.stdout.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }

    for candidate in ["main", "master"] {
        if git
            .run(
                &repo.root,
                ["show-ref", "--verify", "--quiet", &format!("refs/heads/{candidate}")],
            )
            .is_ok()
        {
            return Ok(candidate.to_string());
        }
    }

    Err(GitError::RefNotFound {
        reference: "HEAD (no default branch could be determined)".to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub input: String,
    pub sha: String,
}

/// Resolves a single ref expression (`rev_parse`): `HEAD`,
/// `HEAD~N`, tag, branch, or abbreviated sha. Range forms (`a..b`, `a...b`)
/// are split by the caller before reaching this function.
pub fn rev_parse(repo: &RepoHandle, reference: &str, git: &GitCli) -> Result<ResolvedRef, GitError> {
    let verified = format!("{reference}^{{commit}}");
    match git.run(&repo.root, ["rev-parse", "--verify", "--quiet", &verified]) {
        Ok(output) => {
            let sha = output.stdout.trim().to_string();
            if sha.is_empty() {
                Err(GitError::RefNotFound {
                    reference: reference.to_string(),
                })
            } else {
                Ok(ResolvedRef {
                    input: reference.to_string(),
                    sha,
                })
            }
        }
        Err(GitError::CommandFailed { .. }) => Err(GitError::RefNotFound {
            reference: reference.to_string(),
        }),
        Err(err) => Err(err),
    }
}

/// Splits a caller-supplied ref expression into `(from, to)` if it is a
/// range form (`a..b` or `a...b`), otherwise returns `None`.
pub fn split_range(expr: &str) -> Option<(String, String)> {
    if let Some(idx) = expr.find("...") {
        let (a, b) = expr.split_at(idx);
        let b = &b[3..];
        if !a.is_empty() && !b.is_empty() {
            return Some((a.to_string(), b.to_string()));
        }
    }
    if let Some(idx) = expr.find("..") {
        let (a, b) = expr.split_at(idx);
        let b = &b[2..];
        if !a.is_empty() && !b.is_empty() {
            return Some((a.to_string(), b.to_string()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_range_handles_two_dot_form() {
        assert_eq!(
            split_range("main..feature"),
            Some(("main".to_string(), "feature".to_string()))
        );
    }

    #[test]
    fn split_range_handles_three_dot_form() {
        assert_eq!(
            split_range("main...feature"),
            Some(("main".to_string(), "feature".to_string()))
        );
    }

    #[test]
    fn split_range_returns_none_for_plain_ref() {
        assert_eq!(split_range("HEAD~3"), None);
    }
}
