//! Domain vocabulary shared by every crate in the workspace: ecosystem and
//! dependency-kind enums, the manifest adapter's output shape, and the
//! change/snapshot value types the analyzer, store, and query surface all
//! pass around.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A package-manager namespace. New ecosystems are added here and in the
/// adapter registry together; nothing else in the workspace enumerates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Rubygems,
    Npm,
    Cargo,
    Pypi,
    Docker,
    GithubActions,
}

impl Ecosystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Ecosystem::Rubygems => "rubygems",
            Ecosystem::Npm => "npm",
            Ecosystem::Cargo => "cargo",
            Ecosystem::Pypi => "pypi",
            Ecosystem::Docker => "docker",
            Ecosystem::GithubActions => "github-actions",
        }
    }

    pub fn all() -> &'static [Ecosystem] {
        &[
            Ecosystem::Rubygems,
            Ecosystem::Npm,
            Ecosystem::Cargo,
            Ecosystem::Pypi,
            Ecosystem::Docker,
            Ecosystem::GithubActions,
        ]
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "rubygems" | "gem" | "bundler" => Ok(Ecosystem::Rubygems),
            "npm" | "node" | "javascript" => Ok(Ecosystem::Npm),
            "cargo" | "rust" => Ok(Ecosystem::Cargo),
            "pypi" | "pip" | "python" => Ok(Ecosystem::Pypi),
            "docker" => Ok(Ecosystem::Docker),
            "github-actions" | "actions" | "githubactions" => Ok(Ecosystem::GithubActions),
            other => Err(format!(
                "unknown ecosystem '{other}'. valid values: rubygems, npm, cargo, pypi, docker, github-actions"
            )),
        }
    }
}

/// Whether a recognized file is a human-authored declaration or a
/// resolver-generated pin set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Manifest,
    Lockfile,
}

impl ManifestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ManifestKind::Manifest => "manifest",
            ManifestKind::Lockfile => "lockfile",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManifestKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "manifest" => Ok(ManifestKind::Manifest),
            "lockfile" => Ok(ManifestKind::Lockfile),
            other => Err(format!("unknown manifest kind '{other}'")),
        }
    }
}

/// The role a dependency plays within its declaring manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    #[default]
    Runtime,
    Development,
    Build,
    Peer,
}

impl DependencyType {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyType::Runtime => "runtime",
            DependencyType::Development => "development",
            DependencyType::Build => "build",
            DependencyType::Peer => "peer",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "runtime" => Ok(DependencyType::Runtime),
            "development" | "dev" => Ok(DependencyType::Development),
            "build" => Ok(DependencyType::Build),
            "peer" => Ok(DependencyType::Peer),
            other => Err(format!("unknown dependency type '{other}'")),
        }
    }
}

/// A single `(name, requirement)` declaration parsed out of a manifest blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDependency {
    pub name: String,
    pub requirement: String,
    pub dependency_type: DependencyType,
}

/// The adapter's output for one blob: its ecosystem, whether it is a
/// manifest or lockfile, and its flat dependency list. A successful parse
/// that yields zero dependencies is `ParsedManifest { dependencies: vec![], .. }`,
/// never `None` — `None` is reserved for "this isn't a manifest at all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedManifest {
    pub ecosystem: Ecosystem,
    pub kind: ManifestKind,
    pub dependencies: Vec<ParsedDependency>,
}

/// The kind of event a `DependencyChange` row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "added" => Ok(ChangeType::Added),
            "modified" => Ok(ChangeType::Modified),
            "removed" => Ok(ChangeType::Removed),
            other => Err(format!("unknown change type '{other}'")),
        }
    }
}

/// Status of a path between a commit and its first parent (root commits are
/// treated as all-added).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStatus {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedPath {
    pub path: String,
    pub status: PathStatus,
}

/// Drops paths matching `pkgs.ignoredDirs`/`pkgs.ignoredFiles` fragments
/// before the analyzer ever sees them. A dir fragment matches a whole path
/// segment (`vendor` matches `vendor/Gemfile`, not `vendored/Gemfile`); a
/// file fragment matches anywhere in the path.
pub fn filter_ignored_paths(
    paths: Vec<ChangedPath>,
    ignored_dirs: &[String],
    ignored_files: &[String],
) -> Vec<ChangedPath> {
    if ignored_dirs.is_empty() && ignored_files.is_empty() {
        return paths;
    }
    paths
        .into_iter()
        .filter(|p| !is_ignored_path(&p.path, ignored_dirs, ignored_files))
        .collect()
}

fn is_ignored_path(path: &str, ignored_dirs: &[String], ignored_files: &[String]) -> bool {
    let in_ignored_dir = ignored_dirs
        .iter()
        .any(|frag| !frag.is_empty() && path.split('/').any(|segment| segment == frag));
    let is_ignored_file = ignored_files
        .iter()
        .any(|frag| !frag.is_empty() && path.contains(frag.as_str()));
    in_ignored_dir || is_ignored_file
}

/// A fully-qualified live dependency: what `deps_at` and `list` return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveDependency {
    pub manifest_path: String,
    pub ecosystem: Ecosystem,
    pub kind: ManifestKind,
    pub name: String,
    pub requirement: String,
    pub dependency_type: DependencyType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecosystem_round_trips_through_str() {
        for eco in Ecosystem::all() {
            assert_eq!(Ecosystem::from_str(eco.as_str()).unwrap(), *eco);
        }
    }

    #[test]
    fn dependency_type_defaults_to_runtime() {
        assert_eq!(DependencyType::default(), DependencyType::Runtime);
    }

    #[test]
    fn change_type_rejects_unknown_values() {
        assert!(ChangeType::from_str("bogus").is_err());
    }

    #[test]
    fn filter_ignored_paths_drops_matching_dir_segment() {
        let paths = vec![
            ChangedPath { path: "vendor/Gemfile".into(), status: PathStatus::Added },
            ChangedPath { path: "vendored/Gemfile".into(), status: PathStatus::Added },
            ChangedPath { path: "app/Gemfile".into(), status: PathStatus::Added },
        ];
        let kept = filter_ignored_paths(paths, &["vendor".to_string()], &[]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|p| p.path == "vendored/Gemfile"));
        assert!(kept.iter().any(|p| p.path == "app/Gemfile"));
    }

    #[test]
    fn filter_ignored_paths_drops_matching_file_fragment() {
        let paths = vec![
            ChangedPath { path: "spec/fixtures/package-lock.json".into(), status: PathStatus::Added },
            ChangedPath { path: "package.json".into(), status: PathStatus::Added },
        ];
        let kept = filter_ignored_paths(paths, &[], &["package-lock.json".to_string()]);
        assert_eq!(kept, vec![ChangedPath { path: "package.json".into(), status: PathStatus::Added }]);
    }

    #[test]
    fn filter_ignored_paths_is_noop_when_unconfigured() {
        let paths = vec![ChangedPath { path: "Gemfile".into(), status: PathStatus::Added }];
        assert_eq!(filter_ignored_paths(paths.clone(), &[], &[]), paths);
    }
}
