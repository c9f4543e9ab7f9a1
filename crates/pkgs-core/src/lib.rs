//! Shared domain vocabulary and runtime configuration for `git-pkgs`.

pub mod config;
pub mod types;

pub use config::{EcosystemFilter, EnvValues, RepoConfigValues, RuntimeConfig};
pub use types::{
    filter_ignored_paths, ChangedPath, ChangeType, DependencyType, Ecosystem, LiveDependency,
    ManifestKind, ParsedDependency, ParsedManifest, PathStatus,
};
