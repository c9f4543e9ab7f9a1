use std::fs;
use std::path::Path;
use std::process::Command;

use pkgs_git::{changed_paths, commit_meta, default_branch, open, rev_parse, walk, GitCli};

fn run(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(dir)
        .args(args)
        .status()
        .expect("git must be installed");
    assert!(status.success(), "git {:?} failed", args);
}

fn init_fixture_repo(dir: &Path) {
    run(dir, &["init", "-q"]);
    run(dir, &["config", "user.name", "Alice"]);
    run(dir, &["config", "user.email", "alice@example.com"]);
    fs::write(
        dir.join("Gemfile"),
        "source \"https://rubygems.org\"\ngem \"rails\", \"~> 7.0\"\n",
    )
    .unwrap();
    run(dir, &["add", "."]);
    run(dir, &["commit", "-q", "-m", "add rails"]);

    fs::write(
        dir.join("Gemfile"),
        "source \"https://rubygems.org\"\ngem \"rails\", \"~> 7.1\"\n",
    )
    .unwrap();
    run(dir, &["add", "."]);
    run(dir, &["commit", "-q", "-m", "bump rails"]);
}

#[test]
fn walk_returns_commits_oldest_first() {
    let tmp = tempfile::tempdir().unwrap();
    init_fixture_repo(tmp.path());

    let git = GitCli::default();
    let repo = open(tmp.path(), &git).unwrap();
    let commits = walk(&repo, "HEAD", &git).unwrap();

    assert_eq!(commits.len(), 2);
    assert!(commits[0].is_root());
    assert_eq!(commits[0].message.trim(), "add rails");
    assert_eq!(commits[1].message.trim(), "bump rails");
    assert!(commits[1].committed_at >= commits[0].committed_at);
}

#[test]
fn changed_paths_reports_added_then_modified() {
    let tmp = tempfile::tempdir().unwrap();
    init_fixture_repo(tmp.path());

    let git = GitCli::default();
    let repo = open(tmp.path(), &git).unwrap();
    let commits = walk(&repo, "HEAD", &git).unwrap();

    let first_paths = changed_paths(&repo, &commits[0], &git).unwrap();
    assert_eq!(first_paths.len(), 1);
    assert_eq!(first_paths[0].path, "Gemfile");

    let second_paths = changed_paths(&repo, &commits[1], &git).unwrap();
    assert_eq!(second_paths.len(), 1);
    assert_eq!(second_paths[0].path, "Gemfile");
}

#[test]
fn rev_parse_resolves_head_and_rejects_garbage() {
    let tmp = tempfile::tempdir().unwrap();
    init_fixture_repo(tmp.path());

    let git = GitCli::default();
    let repo = open(tmp.path(), &git).unwrap();

    let head = rev_parse(&repo, "HEAD", &git).unwrap();
    assert_eq!(head.sha.len(), 40);

    let err = rev_parse(&repo, "not-a-real-ref", &git);
    assert!(err.is_err());
}

#[test]
fn commit_meta_fetches_one_commit_without_walking_ancestry() {
    let tmp = tempfile::tempdir().unwrap();
    init_fixture_repo(tmp.path());

    let git = GitCli::default();
    let repo = open(tmp.path(), &git).unwrap();
    let commits = walk(&repo, "HEAD", &git).unwrap();

    let root = commit_meta(&repo, &commits[0].sha, &git).unwrap();
    assert_eq!(root.sha, commits[0].sha);
    assert_eq!(root.message.trim(), "add rails");
    assert!(root.is_root());

    let tip = commit_meta(&repo, &commits[1].sha, &git).unwrap();
    assert_eq!(tip.sha, commits[1].sha);
    assert_eq!(tip.parents, vec![commits[0].sha.clone()]);
}

#[test]
fn default_branch_resolves_without_a_remote() {
    let tmp = tempfile::tempdir().unwrap();
    init_fixture_repo(tmp.path());

    let git = GitCli::default();
    let repo = open(tmp.path(), &git).unwrap();
    let branch = default_branch(&repo, &git).unwrap();
    assert!(!branch.is_empty());
}
