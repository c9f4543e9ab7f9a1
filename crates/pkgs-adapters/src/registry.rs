use std::path::{Path, PathBuf};

use pkgs_core::{EcosystemFilter, ParsedManifest};

use crate::adapter::EcosystemAdapter;
use crate::adapters::{
    CargoAdapter, DockerAdapter, GithubActionsAdapter, NpmAdapter, PypiAdapter, RubygemsAdapter,
};

/// The curated registry of built-in ecosystem parsers (Design Note 1). A
/// caller that needs a different parser set for a custom ecosystem can
/// build its own `AdapterRegistry::new(vec![...])` — the registry itself
/// is not hard-coded into the core pipeline, only this default instance is.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn EcosystemAdapter>>,
}

impl AdapterRegistry {
    pub fn new(adapters: Vec<Box<dyn EcosystemAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn default_registry() -> Self {
        Self::new(vec![
            Box::new(RubygemsAdapter),
            Box::new(NpmAdapter),
            Box::new(CargoAdapter),
            Box::new(PypiAdapter),
            Box::new(DockerAdapter),
            Box::new(GithubActionsAdapter),
        ])
    }

    /// `identify`: filters `paths` down to those recognized by
    /// some adapter. "Multiple results per file: only the first is taken" —
    /// the registry's adapter order is the tie-break.
    pub fn identify(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths
            .iter()
            .filter(|p| self.find_adapter(p).is_some())
            .cloned()
            .collect()
    }

    /// `analyse`: parses `path`'s bytes with the first adapter
    /// that recognizes it, applying `filter` to the resulting ecosystem
    /// before returning. A rejected-by-filter or unrecognized path yields
    /// `None` — the caller (the analyzer) treats both the same.
    pub fn analyse(
        &self,
        path: &Path,
        bytes: &[u8],
        filter: &EcosystemFilter,
    ) -> Option<Result<ParsedManifest, crate::error::ParseFailure>> {
        let adapter = self.find_adapter(path)?;
        let result = adapter.parse(path, bytes);
        if let Ok(parsed) = &result {
            if !filter.accepts(parsed.ecosystem.as_str()) {
                return None;
            }
        }
        Some(result)
    }

    fn find_adapter(&self, path: &Path) -> Option<&dyn EcosystemAdapter> {
        self.adapters
            .iter()
            .find(|a| a.recognize(path).is_some())
            .map(|b| b.as_ref())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::default_registry()
    }
}

/// Convenience free function over the default registry, for callers that
/// don't need a custom adapter set (the CLI, the analyzer's default path).
pub fn identify(paths: &[PathBuf]) -> Vec<PathBuf> {
    AdapterRegistry::default_registry().identify(paths)
}

pub fn analyse(
    path: &Path,
    bytes: &[u8],
    filter: &EcosystemFilter,
) -> Option<Result<ParsedManifest, crate::error::ParseFailure>> {
    AdapterRegistry::default_registry().analyse(path, bytes, filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_filters_to_recognized_paths() {
        let registry = AdapterRegistry::default_registry();
        let paths = vec![
            PathBuf::from("Gemfile"),
            PathBuf::from("README.md"),
            PathBuf::from("package.json"),
        ];
        let identified = registry.identify(&paths);
        assert_eq!(identified.len(), 2);
    }

    #[test]
    fn analyse_rejects_by_ecosystem_filter() {
        let registry = AdapterRegistry::default_registry();
        let bytes = b"gem \"rails\", \"~> 7.0\"\n";
        let filter = EcosystemFilter::new(vec!["npm".to_string()]);
        let result = registry.analyse(Path::new("Gemfile"), bytes, &filter);
        assert!(result.is_none());
    }

    #[test]
    fn analyse_accepts_when_filter_allows_all() {
        let registry = AdapterRegistry::default_registry();
        let bytes = b"gem \"rails\", \"~> 7.0\"\n";
        let filter = EcosystemFilter::allow_all();
        let result = registry.analyse(Path::new("Gemfile"), bytes, &filter);
        assert!(result.is_some());
        assert!(result.unwrap().unwrap().dependencies.len() == 1);
    }

    #[test]
    fn analyse_returns_none_for_unrecognized_path() {
        let registry = AdapterRegistry::default_registry();
        let filter = EcosystemFilter::allow_all();
        let result = registry.analyse(Path::new("README.md"), b"hello", &filter);
        assert!(result.is_none());
    }
}
