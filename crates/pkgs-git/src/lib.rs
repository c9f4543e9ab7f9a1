//! Repository gateway: opens a repository,
//! resolves refs, walks commit history, computes per-commit changed-path
//! sets, and reads blob bytes by object id. Implemented over the system
//! `git` binary via subprocess, never a bundled git implementation.

pub mod blob;
pub mod command;
pub mod error;
pub mod prefetch;
pub mod repo;
pub mod walk;

pub use blob::{blob_bytes, blob_oid_at, path_exists_in_tree, BatchCatFile, OidLookupCache};
pub use command::{GitCli, GitOutput};
pub use error::GitError;
pub use prefetch::{prefetch_changed_paths, PrefetchMap};
pub use repo::{default_branch, open, rev_parse, split_range, RepoHandle, ResolvedRef};
pub use walk::{changed_paths, commit_meta, walk, walk_since, CommitMeta};
