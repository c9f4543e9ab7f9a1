use pkgs_core::RepoConfigValues;
use pkgs_git::{GitCli, GitError};

/// Loads the `pkgs.*` and `color.*`/`core.pager` repository-config tier
/// via `git config` rather than parsing `.git/config` directly.
pub fn load_repo_config(repo_root: &std::path::Path, git: &GitCli) -> RepoConfigValues {
    let mut values = RepoConfigValues::default();

    if let Ok(output) = git.run(repo_root, ["config", "--get-regexp", r"^pkgs\."]) {
        for line in output.stdout.lines() {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key.to_lowercase().as_str() {
                "pkgs.batchsize" => values.batch_size = Some(value.to_string()),
                "pkgs.snapshotinterval" => values.snapshot_interval = Some(value.to_string()),
                "pkgs.threads" => values.threads = Some(value.to_string()),
                "pkgs.ecosystems" => values.ecosystems.push(value.to_string()),
                "pkgs.ignoreddirs" => values.ignored_dirs.push(value.to_string()),
                "pkgs.ignoredfiles" => values.ignored_files.push(value.to_string()),
                _ => {}
            }
        }
    }

    values.color_pkgs = get_single(repo_root, git, "color.pkgs");
    values.color_ui = get_single(repo_root, git, "color.ui");
    values.core_pager = get_single(repo_root, git, "core.pager");

    values
}

fn get_single(repo_root: &std::path::Path, git: &GitCli, key: &str) -> Option<String> {
    match git.run(repo_root, ["config", "--get", key]) {
        Ok(output) => {
            let value = output.stdout.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        Err(GitError::CommandFailed { .. }) => None,
        Err(_) => None,
    }
}
