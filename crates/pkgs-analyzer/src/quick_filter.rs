use regex::RegexSet;

/// stage 1: a compiled union regex over common manifest path
/// shapes. A commit whose changed paths all miss this set is skipped
/// without invoking the (more expensive) adapter registry.
pub struct QuickFilter {
    set: RegexSet,
}

impl QuickFilter {
    pub fn new() -> Self {
        let patterns = [
            r"(^|/)Gemfile$",
            r"(^|/)Gemfile\.lock$",
            r"\.gemspec$",
            r"(^|/)package\.json$",
            r"(^|/)package-lock\.json$",
            r"(^|/)Cargo\.toml$",
            r"(^|/)Cargo\.lock$",
            r"(^|/)pyproject\.toml$",
            r"(^|/)requirements\.txt$",
            r"(^|/)Dockerfile$",
            r"\.Dockerfile$",
            r"^\.github/workflows/[^/]+\.ya?ml$",
        ];
        let set = RegexSet::new(patterns).expect("quick filter patterns are valid regexes");
        Self { set }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    pub fn any_match(&self, paths: impl IntoIterator<Item = impl AsRef<str>>) -> bool {
        paths.into_iter().any(|p| self.matches(p.as_ref()))
    }
}

impl Default for QuickFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_manifest_shapes() {
        let filter = QuickFilter::new();
        assert!(filter.matches("Gemfile"));
        assert!(filter.matches("sub/dir/Gemfile.lock"));
        assert!(filter.matches("foo.gemspec"));
        assert!(filter.matches("package.json"));
        assert!(filter.matches("Cargo.toml"));
        assert!(filter.matches("pyproject.toml"));
        assert!(filter.matches("requirements.txt"));
        assert!(filter.matches("Dockerfile"));
        assert!(filter.matches("service.Dockerfile"));
        assert!(filter.matches(".github/workflows/ci.yml"));
    }

    #[test]
    fn rejects_unrelated_paths() {
        let filter = QuickFilter::new();
        assert!(!filter.matches("README.md"));
        assert!(!filter.matches("src/main.rs"));
        assert!(!filter.matches(".github/ci.yml"));
    }

    #[test]
    fn any_match_short_circuits_commits_with_no_manifest_touch() {
        let filter = QuickFilter::new();
        assert!(!filter.any_match(["src/lib.rs", "README.md"]));
        assert!(filter.any_match(["src/lib.rs", "Cargo.toml"]));
    }
}
