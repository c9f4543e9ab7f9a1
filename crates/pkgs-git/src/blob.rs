use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::command::GitCli;
use crate::error::GitError;
use crate::repo::RepoHandle;

/// `blob_oid_at`: the object id of `path` at `sha`, or `None` if
/// the path did not exist there. Missing objects are not an error.
pub fn blob_oid_at(
    repo: &RepoHandle,
    sha: &str,
    path: &str,
    git: &GitCli,
) -> Result<Option<String>, GitError> {
    let rev = format!("{sha}:{path}");
    match git.run(&repo.root, ["rev-parse", "--verify", "--quiet", &rev]) {
        Ok(output) => {
            let oid = output.stdout.trim().to_string();
            if oid.is_empty() {
                Ok(None)
            } else {
                Ok(Some(oid))
            }
        }
        Err(GitError::CommandFailed { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// `blob_bytes`, one-shot variant for ad-hoc callers (the batch
/// protocol below is the indexer's hot-path equivalent).
pub fn blob_bytes(repo: &RepoHandle, oid: &str, git: &GitCli) -> Result<Option<Vec<u8>>, GitError> {
    match git.run_bytes(&repo.root, ["cat-file", "blob", oid]) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(GitError::CommandFailed { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// A long-lived `git cat-file --batch` subprocess, used by the indexer's
/// hot path instead of spawning one process per blob. Speaks the framed
/// protocol documented in `git-cat-file(1)`: write an oid followed by a
/// newline, read back `<oid> <type> <size>\n<payload>\n`.
pub struct BatchCatFile {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl BatchCatFile {
    pub fn spawn(repo: &RepoHandle, git: &GitCli) -> Result<Self, GitError> {
        let mut child = Command::new(&git.binary)
            .current_dir(&repo.root)
            .arg("cat-file")
            .arg("--batch")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| GitError::Io {
                command: "git cat-file --batch".to_string(),
                source,
            })?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    /// Looks up one blob by oid. `None` if the object is missing or is not
    /// a blob (e.g. a tree or commit oid passed in error).
    pub fn get(&mut self, oid: &str) -> Result<Option<Vec<u8>>, GitError> {
        writeln!(self.stdin, "{oid}").map_err(|source| GitError::Io {
            command: "git cat-file --batch (write)".to_string(),
            source,
        })?;
        self.stdin.flush().map_err(|source| GitError::Io {
            command: "git cat-file --batch (flush)".to_string(),
            source,
        })?;

        let mut header = String::new();
        self.stdout
            .read_line(&mut header)
            .map_err(|source| GitError::Io {
                command: "git cat-file --batch (read header)".to_string(),
                source,
            })?;
        let header = header.trim_end();

        if header.ends_with("missing") {
            return Ok(None);
        }

        let mut parts = header.split_whitespace();
        let _oid = parts.next();
        let obj_type = parts.next().unwrap_or_default();
        let size: usize = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| GitError::Parse {
                context: format!("unparseable cat-file --batch header: {header}"),
            })?;

        let mut payload = vec![0u8; size];
        self.stdout
            .read_exact(&mut payload)
            .map_err(|source| GitError::Io {
                command: "git cat-file --batch (read payload)".to_string(),
                source,
            })?;
        // trailing newline after each payload
        let mut trailing = [0u8; 1];
        let _ = self.stdout.read_exact(&mut trailing);

        if obj_type != "blob" {
            return Ok(None);
        }
        Ok(Some(payload))
    }
}

impl Drop for BatchCatFile {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A simple in-memory cache over `blob_oid_at` results for callers (like
/// the analyzer) that look up the same `(commit, path)` repeatedly within a
/// run. Kept here rather than in the analyzer crate since it only touches
/// the gateway's own lookup, not parse results.
#[derive(Debug, Default)]
pub struct OidLookupCache {
    cache: HashMap<(String, String), Option<String>>,
}

impl OidLookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_resolve(
        &mut self,
        repo: &RepoHandle,
        sha: &str,
        path: &str,
        git: &GitCli,
    ) -> Result<Option<String>, GitError> {
        let key = (sha.to_string(), path.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }
        let resolved = blob_oid_at(repo, sha, path, git)?;
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }
}

/// Best-effort path existence check used by `pkgs-textconv` and other
/// ad-hoc readers that only need raw bytes without the batch protocol's
/// lifecycle.
pub fn path_exists_in_tree(repo_root: &Path, relative: &str) -> bool {
    repo_root.join(relative).is_file()
}
