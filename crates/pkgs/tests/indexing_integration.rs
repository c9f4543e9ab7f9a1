use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pkgs_core::config::{EnvValues, RepoConfigValues};
use pkgs_core::RuntimeConfig;
use pkgs_git::GitCli;
use pkgs_progress::NullProgressSink;
use pkgs_store::SqliteStore;

use pkgs::indexer;
use pkgs::queries;
use pkgs::reconstructor::deps_at_sha;
use pkgs::updater;

const BRANCH: &str = "HEAD";

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(dir)
        .args(args)
        .status()
        .expect("git must be installed");
    assert!(status.success(), "git {:?} failed", args);
}

fn write_package_json(dir: &Path, deps: &[(&str, &str)]) {
    let body: Vec<String> = deps
        .iter()
        .map(|(name, version)| format!("    \"{name}\": \"{version}\""))
        .collect();
    let json = format!("{{\n  \"dependencies\": {{\n{}\n  }}\n}}\n", body.join(",\n"));
    fs::write(dir.join("package.json"), json).unwrap();
}

fn default_config() -> RuntimeConfig {
    RuntimeConfig::resolve(
        None,
        None,
        None,
        None,
        None,
        None,
        false,
        false,
        false,
        &EnvValues::default(),
        &RepoConfigValues::default(),
    )
}

/// Builds a 3-commit repo: add `left-pad`, add `lodash`, then remove
/// `left-pad` — exercising all three `analyze_commit` branches end to end.
fn init_three_commit_repo(dir: &Path) {
    run_git(dir, &["init", "-q"]);
    run_git(dir, &["config", "user.name", "Alice"]);
    run_git(dir, &["config", "user.email", "alice@example.com"]);

    write_package_json(dir, &[("left-pad", "1.0.0")]);
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-q", "-m", "add left-pad"]);

    write_package_json(dir, &[("left-pad", "1.0.0"), ("lodash", "4.0.0")]);
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-q", "-m", "add lodash"]);

    write_package_json(dir, &[("lodash", "4.0.0")]);
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-q", "-m", "remove left-pad"]);
}

#[test]
fn init_indexes_a_single_commit_and_list_reports_its_dependencies() {
    let tmp = tempfile::tempdir().unwrap();
    run_git(tmp.path(), &["init", "-q"]);
    run_git(tmp.path(), &["config", "user.name", "Alice"]);
    run_git(tmp.path(), &["config", "user.email", "alice@example.com"]);
    write_package_json(tmp.path(), &[("left-pad", "1.0.0")]);
    run_git(tmp.path(), &["add", "."]);
    run_git(tmp.path(), &["commit", "-q", "-m", "add left-pad"]);

    let git = GitCli::default();
    let repo = pkgs_git::open(tmp.path(), &git).unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    let config = default_config();
    let cancel = Arc::new(AtomicBool::new(false));
    let mut sink = NullProgressSink;

    let summary = indexer::init(&repo, &git, &mut store, &config, BRANCH, None, false, &cancel, &mut sink)
        .expect("init should succeed");
    assert_eq!(summary.commits_indexed, 1);
    assert_eq!(summary.change_bearing_commits, 1);

    let commit = store
        .find_commit_by_sha(&summary.tip_sha)
        .unwrap()
        .expect("tip commit should be stored");
    let deps = queries::list(&store, &commit, None, None).unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].name, "left-pad");
    assert_eq!(deps[0].requirement, "1.0.0");
}

#[test]
fn update_resumes_from_checkpoint_and_reflects_removed_dependency() {
    let tmp = tempfile::tempdir().unwrap();
    run_git(tmp.path(), &["init", "-q"]);
    run_git(tmp.path(), &["config", "user.name", "Alice"]);
    run_git(tmp.path(), &["config", "user.email", "alice@example.com"]);

    write_package_json(tmp.path(), &[("left-pad", "1.0.0")]);
    run_git(tmp.path(), &["add", "."]);
    run_git(tmp.path(), &["commit", "-q", "-m", "add left-pad"]);

    let git = GitCli::default();
    let repo = pkgs_git::open(tmp.path(), &git).unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    let config = default_config();
    let cancel = Arc::new(AtomicBool::new(false));
    let mut sink = NullProgressSink;

    // Index against the single existing commit first...
    let first_summary =
        indexer::init(&repo, &git, &mut store, &config, BRANCH, None, false, &cancel, &mut sink).unwrap();
    assert_eq!(first_summary.commits_indexed, 1);

    // ...then commit more history and resume from the stored checkpoint via
    // `update`, rather than indexing everything in one go.
    write_package_json(tmp.path(), &[("left-pad", "1.0.0"), ("lodash", "4.0.0")]);
    run_git(tmp.path(), &["add", "."]);
    run_git(tmp.path(), &["commit", "-q", "-m", "add lodash"]);

    write_package_json(tmp.path(), &[("lodash", "4.0.0")]);
    run_git(tmp.path(), &["add", "."]);
    run_git(tmp.path(), &["commit", "-q", "-m", "remove left-pad"]);

    let update_summary =
        updater::update(&repo, &git, &mut store, &config, BRANCH, &cancel, &mut sink).unwrap();
    assert_eq!(update_summary.commits_indexed, 2);
    assert_eq!(update_summary.change_bearing_commits, 2);

    let tip = pkgs_git::rev_parse(&repo, "HEAD", &git).unwrap();
    let commit = store
        .find_commit_by_sha(&tip.sha)
        .unwrap()
        .expect("tip commit should be stored after update");

    let deps = queries::list(&store, &commit, None, None).unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].name, "lodash");

    let history = queries::history(&store, Some("left-pad"), None, None, None, None).unwrap();
    assert_eq!(history.len(), 2, "left-pad should show one add and one remove");
    assert!(history.iter().any(|c| c.change_type == "added"));
    assert!(history.iter().any(|c| c.change_type == "removed"));
}

#[test]
fn diff_between_two_points_in_history_matches_reconstructed_snapshots() {
    let tmp = tempfile::tempdir().unwrap();
    init_three_commit_repo(tmp.path());

    let git = GitCli::default();
    let repo = pkgs_git::open(tmp.path(), &git).unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    let config = default_config();
    let cancel = Arc::new(AtomicBool::new(false));
    let mut sink = NullProgressSink;

    indexer::init(&repo, &git, &mut store, &config, BRANCH, None, false, &cancel, &mut sink).unwrap();

    let commits = pkgs_git::walk(&repo, "HEAD", &git).unwrap();
    assert_eq!(commits.len(), 3);
    let first = store.find_commit_by_sha(&commits[0].sha).unwrap().unwrap();
    let last = store.find_commit_by_sha(&commits[2].sha).unwrap().unwrap();

    let from = deps_at_sha(&store, first.id, first.committed_at).unwrap();
    let to = deps_at_sha(&store, last.id, last.committed_at).unwrap();

    let diff = queries::diff(&from, &to);
    assert_eq!(diff.len(), 2);
    assert!(diff
        .iter()
        .any(|e| e.name == "left-pad" && e.change_type == "removed"));
    assert!(diff
        .iter()
        .any(|e| e.name == "lodash" && e.change_type == "added"));
}
