use pkgs_analyzer::BlobSource;
use pkgs_git::{BatchCatFile, GitCli, OidLookupCache, RepoHandle};

/// Wires the analyzer's `BlobSource` seam to the real git gateway: oid
/// lookups go through a per-run `OidLookupCache`, blob bytes through a
/// long-lived `cat-file --batch` subprocess rather than one spawn per blob.
pub struct GitBlobSource<'a> {
    repo: &'a RepoHandle,
    git: &'a GitCli,
    oids: OidLookupCache,
    cat_file: BatchCatFile,
}

impl<'a> GitBlobSource<'a> {
    pub fn new(repo: &'a RepoHandle, git: &'a GitCli) -> Result<Self, pkgs_git::GitError> {
        Ok(Self {
            repo,
            git,
            oids: OidLookupCache::new(),
            cat_file: BatchCatFile::spawn(repo, git)?,
        })
    }
}

impl BlobSource for GitBlobSource<'_> {
    fn blob_oid_at(&mut self, sha: &str, path: &str) -> Result<Option<String>, String> {
        self.oids
            .get_or_resolve(self.repo, sha, path, self.git)
            .map_err(|e| e.to_string())
    }

    fn blob_bytes(&mut self, oid: &str) -> Result<Option<Vec<u8>>, String> {
        self.cat_file.get(oid).map_err(|e| e.to_string())
    }
}
