//! The process-wide runtime configuration record (Design Note "Global
//! mutable configuration"). Built once at process start from CLI flags,
//! environment variables, and repository config, then threaded explicitly
//! into every component. Nothing in this workspace reads `std::env` outside
//! the small resolver functions below and the CLI's own assembly code.

use std::path::PathBuf;

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_SNAPSHOT_INTERVAL: usize = 50;
pub const DEFAULT_THREADS: usize = 4;
pub const PREFETCH_THREAD_THRESHOLD: usize = 1_500;

/// Values read out of repository config (`git config --get-regexp '^pkgs\.'`),
/// kept as plain strings until a resolver parses them. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoConfigValues {
    pub batch_size: Option<String>,
    pub snapshot_interval: Option<String>,
    pub threads: Option<String>,
    pub ecosystems: Vec<String>,
    pub ignored_dirs: Vec<String>,
    pub ignored_files: Vec<String>,
    pub color_pkgs: Option<String>,
    pub color_ui: Option<String>,
    pub core_pager: Option<String>,
}

/// Raw environment values the resolvers consult. Captured into a struct
/// (rather than read ad hoc) so the precedence logic stays unit-testable
/// without mutating the real process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvValues {
    pub batch_size: Option<String>,
    pub snapshot_interval: Option<String>,
    pub threads: Option<String>,
    pub db_path: Option<String>,
    pub no_color: Option<String>,
}

impl EnvValues {
    pub fn from_process_env() -> Self {
        Self {
            batch_size: std::env::var("GIT_PKGS_BATCH_SIZE").ok(),
            snapshot_interval: std::env::var("GIT_PKGS_SNAPSHOT_INTERVAL").ok(),
            threads: std::env::var("GIT_PKGS_THREADS").ok(),
            db_path: std::env::var("GIT_PKGS_DB").ok(),
            no_color: std::env::var("NO_COLOR").ok(),
        }
    }
}

/// Resolves one `usize` tunable through CLI flag -> env -> repo-config ->
/// default, in that order. Any tier that fails to parse as a `usize` is
/// treated the same as absent (falls through to the next tier) rather than
/// raising, since a malformed repo-config value should not abort the run.
pub fn resolve_usize_tunable(
    cli: Option<usize>,
    env: Option<&str>,
    repo_config: Option<&str>,
    default: usize,
) -> usize {
    if let Some(value) = cli {
        return value;
    }
    if let Some(value) = env.and_then(|v| v.trim().parse::<usize>().ok()) {
        return value;
    }
    if let Some(value) = repo_config.and_then(|v| v.trim().parse::<usize>().ok()) {
        return value;
    }
    default
}

/// Resolved ecosystem allowlist: empty means "accept everything", matching
/// `pkgs.ecosystems` semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EcosystemFilter {
    allowed: Vec<String>,
}

impl EcosystemFilter {
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: allowed.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn allow_all() -> Self {
        Self { allowed: vec![] }
    }

    pub fn accepts(&self, ecosystem: &str) -> bool {
        self.allowed.is_empty() || self.allowed.iter().any(|e| e == ecosystem)
    }
}

/// The fully-resolved, immutable configuration threaded through the
/// indexer, updater, reconstructor, and query surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub git_dir: Option<PathBuf>,
    pub work_tree: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub batch_size: usize,
    pub snapshot_interval: usize,
    pub threads: usize,
    pub ecosystems: EcosystemFilter,
    pub ignored_dirs: Vec<String>,
    pub ignored_files: Vec<String>,
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

impl RuntimeConfig {
    /// Assembles the record from every tier at once. Called exactly once,
    /// at process start, by the CLI.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        git_dir: Option<PathBuf>,
        work_tree: Option<PathBuf>,
        db_path_flag: Option<PathBuf>,
        batch_size_flag: Option<usize>,
        snapshot_interval_flag: Option<usize>,
        threads_flag: Option<usize>,
        quiet: bool,
        json: bool,
        no_color_flag: bool,
        env: &EnvValues,
        repo: &RepoConfigValues,
    ) -> Self {
        let db_path = db_path_flag.or_else(|| env.db_path.clone().map(PathBuf::from));
        let batch_size = resolve_usize_tunable(
            batch_size_flag,
            env.batch_size.as_deref(),
            repo.batch_size.as_deref(),
            DEFAULT_BATCH_SIZE,
        );
        let snapshot_interval = resolve_usize_tunable(
            snapshot_interval_flag,
            env.snapshot_interval.as_deref(),
            repo.snapshot_interval.as_deref(),
            DEFAULT_SNAPSHOT_INTERVAL,
        );
        let threads = resolve_usize_tunable(
            threads_flag,
            env.threads.as_deref(),
            repo.threads.as_deref(),
            DEFAULT_THREADS,
        );
        let no_color = no_color_flag || env.no_color.is_some();

        Self {
            git_dir,
            work_tree,
            db_path,
            batch_size,
            snapshot_interval,
            threads,
            ecosystems: EcosystemFilter::new(repo.ecosystems.clone()),
            ignored_dirs: repo.ignored_dirs.clone(),
            ignored_files: repo.ignored_files.clone(),
            quiet,
            json,
            no_color,
        }
    }

    pub fn db_path_for(&self, git_dir: &std::path::Path) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| git_dir.join("pkgs.sqlite3"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_every_other_tier() {
        let resolved = resolve_usize_tunable(Some(10), Some("20"), Some("30"), 40);
        assert_eq!(resolved, 10);
    }

    #[test]
    fn env_wins_over_repo_config_and_default() {
        let resolved = resolve_usize_tunable(None, Some("20"), Some("30"), 40);
        assert_eq!(resolved, 20);
    }

    #[test]
    fn repo_config_wins_over_default() {
        let resolved = resolve_usize_tunable(None, None, Some("30"), 40);
        assert_eq!(resolved, 30);
    }

    #[test]
    fn falls_back_to_default_when_all_tiers_absent() {
        let resolved = resolve_usize_tunable(None, None, None, 40);
        assert_eq!(resolved, 40);
    }

    #[test]
    fn malformed_tier_falls_through_instead_of_panicking() {
        let resolved = resolve_usize_tunable(None, Some("not-a-number"), Some("30"), 40);
        assert_eq!(resolved, 30);
    }

    #[test]
    fn empty_ecosystem_filter_accepts_everything() {
        let filter = EcosystemFilter::allow_all();
        assert!(filter.accepts("npm"));
        assert!(filter.accepts("rubygems"));
    }

    #[test]
    fn non_empty_ecosystem_filter_rejects_others() {
        let filter = EcosystemFilter::new(vec!["npm".to_string()]);
        assert!(filter.accepts("npm"));
        assert!(!filter.accepts("cargo"));
    }

    #[test]
    fn runtime_config_resolves_db_path_from_env_when_no_flag() {
        let env = EnvValues {
            db_path: Some("/tmp/custom.sqlite3".to_string()),
            ..Default::default()
        };
        let repo = RepoConfigValues::default();
        let cfg = RuntimeConfig::resolve(
            None, None, None, None, None, None, false, false, false, &env, &repo,
        );
        assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/custom.sqlite3")));
    }
}
