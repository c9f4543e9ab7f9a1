use std::path::Path;

use pkgs_core::{ManifestKind, ParsedManifest};

use crate::error::ParseFailure;

/// The replaceable-capability seam from Design Note 1: a concrete
/// ecosystem parser identifies whether it owns a path, then turns that
/// path's blob bytes into a `ParsedManifest`. Every variant is a pure
/// function of `(path, bytes)` — no I/O inside an adapter.
pub trait EcosystemAdapter: Send + Sync {
    /// Returns `Some(kind)` if this adapter recognizes `path` by name/shape
    /// alone (no bytes needed yet).
    fn recognize(&self, path: &Path) -> Option<ManifestKind>;

    /// Parses blob bytes for a path this adapter has already recognized.
    /// A successful parse yielding zero dependencies is
    /// `Ok(ParsedManifest { dependencies: vec![], .. })`, never an error.
    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedManifest, ParseFailure>;
}

pub(crate) fn basename(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("")
}

pub(crate) fn extension(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

pub(crate) fn as_utf8<'a>(path: &Path, bytes: &'a [u8]) -> Result<&'a str, ParseFailure> {
    std::str::from_utf8(bytes).map_err(|_| ParseFailure::NotUtf8 {
        path: path.display().to_string(),
    })
}
