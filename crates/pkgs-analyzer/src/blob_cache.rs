use std::collections::HashMap;

use pkgs_adapters::AdapterRegistry;
use pkgs_core::{EcosystemFilter, ParsedManifest};

/// "Blob cache": keyed by `(blob_oid, path)`, process-local,
/// unbounded for the duration of one index run. Sharing a blob oid across
/// many commits (an unchanged manifest re-touched by a sibling file in the
/// same commit, or a file restored to an earlier state) is the dominant
/// speedup. Populated only from the main thread.
///
/// The cached value is `None` when the path wasn't recognized as a
/// manifest at all (or was rejected by the ecosystem filter), and
/// `Some(Err(..))` when recognized but unparseable — both are recorded so a
/// repeat lookup never re-invokes the adapter registry.
#[derive(Default)]
pub struct BlobCache {
    entries: HashMap<(String, String), Option<Result<ParsedManifest, String>>>,
    hits: usize,
    misses: usize,
}

impl BlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached parse for `(oid, path)`, computing and storing it
    /// via `registry.analyse` on a miss. Takes the caller's registry rather
    /// than building a default one, so a custom adapter set (spec §6: the
    /// recognized pattern set must be replaceable at the boundary) is
    /// actually honored on the parse path, not just identification.
    pub fn get_or_parse(
        &mut self,
        registry: &AdapterRegistry,
        oid: &str,
        path: &str,
        bytes: &[u8],
        filter: &EcosystemFilter,
    ) -> Option<Result<ParsedManifest, String>> {
        let key = (oid.to_string(), path.to_string());
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return hit.clone();
        }
        self.misses += 1;
        let parsed = registry
            .analyse(std::path::Path::new(path), bytes, filter)
            .map(|r| r.map_err(|e| e.to_string()));
        self.entries.insert(key, parsed.clone());
        parsed
    }

    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookup_of_same_oid_is_a_cache_hit() {
        let registry = AdapterRegistry::default_registry();
        let mut cache = BlobCache::new();
        let filter = EcosystemFilter::allow_all();
        let bytes = b"gem \"rails\", \"~> 7.0\"\n";
        let first = cache.get_or_parse(&registry, "oid1", "Gemfile", bytes, &filter);
        let second = cache.get_or_parse(&registry, "oid1", "Gemfile", bytes, &filter);
        assert_eq!(first, second);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn unparseable_bytes_are_cached_as_failures() {
        let registry = AdapterRegistry::default_registry();
        let mut cache = BlobCache::new();
        let filter = EcosystemFilter::allow_all();
        let bytes = b"{not json";
        let result = cache.get_or_parse(&registry, "oid2", "package.json", bytes, &filter);
        assert!(matches!(result, Some(Err(_))));
    }

    #[test]
    fn unrecognized_path_caches_as_none() {
        let registry = AdapterRegistry::default_registry();
        let mut cache = BlobCache::new();
        let filter = EcosystemFilter::allow_all();
        let result = cache.get_or_parse(&registry, "oid3", "README.md", b"hello", &filter);
        assert!(result.is_none());
    }
}
