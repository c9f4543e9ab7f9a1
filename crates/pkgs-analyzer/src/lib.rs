//! Manifest analyzer: quick pattern prefilter,
//! blob-content cache, and the per-commit add/modify/remove dependency
//! diff against a live snapshot mapping.

pub mod analyzer;
pub mod blob_cache;
pub mod quick_filter;
pub mod types;

pub use analyzer::{analyze_commit, AnalyzerContext, BlobSource};
pub use blob_cache::BlobCache;
pub use quick_filter::QuickFilter;
pub use types::{
    CommitAnalysis, DependencyChangeRow, LiveSnapshot, ManifestRef, SnapshotKey, SnapshotValue,
};
