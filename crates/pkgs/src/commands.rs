//! Subcommand dispatch: turns a parsed `cli::Cli`
//! into store/query/indexer/updater calls and renders the result, either
//! as a plain-text table or as `--format=json`.

use std::io::Write as _;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pkgs_core::RuntimeConfig;
use pkgs_git::{split_range, GitCli, RepoHandle};
use pkgs_progress::build_sink;
use pkgs_store::SqliteStore;
use serde_json::json;

use crate::cli::StatsByArg;
use crate::error::{CliError, QueryError};
use crate::output::{print_or_page, table, Painter};
use crate::{indexer, queries, reconstructor, textconv, updater, workingtree};

/// Everything a command needs: the open repository, the git gateway, a
/// mutable store handle, resolved config, and the rendering choices
/// (`json`/painter/pager) derived from it. One instance per process run.
pub struct CommandContext<'a> {
    pub repo: &'a RepoHandle,
    pub git: &'a GitCli,
    pub store: &'a mut SqliteStore,
    pub config: &'a RuntimeConfig,
    pub pager: Option<String>,
}

impl<'a> CommandContext<'a> {
    fn painter(&self) -> Painter {
        Painter::new(!self.config.no_color && !self.config.json)
    }

    fn emit(&self, text: String, json_value: serde_json::Value) {
        if self.config.json {
            println!("{json_value}");
        } else {
            print_or_page(&text, self.pager.as_deref(), !self.config.quiet);
        }
    }
}

pub fn init(
    ctx: &mut CommandContext,
    branch: Option<&str>,
    since: Option<&str>,
    force: bool,
) -> Result<(), CliError> {
    let branch_name = resolve_branch_name(ctx.repo, ctx.git, branch)?;
    let mut sink = build_sink(ctx.config.quiet, ctx.config.json);
    let cancel = crate::signals::install()?;
    let summary = indexer::init(
        ctx.repo,
        ctx.git,
        ctx.store,
        ctx.config,
        &branch_name,
        since,
        force,
        &cancel,
        sink.as_mut(),
    )?;
    ctx.emit(
        format!(
            "indexed {} commits on '{}' ({} with dependency changes)",
            summary.commits_indexed, summary.branch, summary.change_bearing_commits
        ),
        json!({
            "branch": summary.branch,
            "tip_sha": summary.tip_sha,
            "commits_indexed": summary.commits_indexed,
            "change_bearing_commits": summary.change_bearing_commits,
        }),
    );
    Ok(())
}

pub fn update(ctx: &mut CommandContext, branch: Option<&str>) -> Result<(), CliError> {
    let branch_name = resolve_branch_name(ctx.repo, ctx.git, branch)?;
    let mut sink = build_sink(ctx.config.quiet, ctx.config.json);
    let cancel = crate::signals::install()?;
    let summary = updater::update(ctx.repo, ctx.git, ctx.store, ctx.config, &branch_name, &cancel, sink.as_mut())?;
    ctx.emit(
        format!(
            "updated '{}': {} new commits ({} with dependency changes)",
            summary.branch, summary.commits_indexed, summary.change_bearing_commits
        ),
        json!({
            "branch": summary.branch,
            "commits_indexed": summary.commits_indexed,
            "change_bearing_commits": summary.change_bearing_commits,
        }),
    );
    Ok(())
}

pub fn list(
    ctx: &mut CommandContext,
    commit_ref: Option<&str>,
    ecosystem: Option<&str>,
    manifest: Option<&str>,
) -> Result<(), CliError> {
    let commit = resolve_commit(ctx, commit_ref)?;
    let deps = queries::list(ctx.store, &commit, ecosystem, manifest)?;
    let rows: Vec<Vec<String>> = deps
        .iter()
        .map(|d| {
            vec![
                d.manifest_path.clone(),
                d.ecosystem.as_str().to_string(),
                d.name.clone(),
                d.requirement.clone(),
                d.dependency_type.as_str().to_string(),
            ]
        })
        .collect();
    let text = table(&["manifest", "ecosystem", "name", "requirement", "type"], &rows);
    ctx.emit(text, json!(deps));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn history(
    ctx: &mut CommandContext,
    name: Option<&str>,
    ecosystem: Option<&str>,
    author: Option<&str>,
    since: Option<&str>,
    until: Option<&str>,
) -> Result<(), CliError> {
    let since = since.map(parse_date).transpose()?;
    let until = until.map(parse_date).transpose()?;
    let changes = queries::history(ctx.store, name, ecosystem, author, since, until)?;
    let painter = ctx.painter();
    let rows: Vec<Vec<String>> = changes
        .iter()
        .map(|c| {
            let change_type = match c.change_type.as_str() {
                "added" => painter.added(&c.change_type),
                "removed" => painter.removed(&c.change_type),
                _ => painter.modified(&c.change_type),
            };
            vec![
                c.committed_at.to_rfc3339(),
                c.commit_sha[..c.commit_sha.len().min(10)].to_string(),
                c.manifest_path.clone(),
                c.name.clone(),
                change_type,
                c.requirement.clone(),
            ]
        })
        .collect();
    let text = table(&["committed_at", "commit", "manifest", "name", "change", "requirement"], &rows);
    ctx.emit(text, json!(changes));
    Ok(())
}

pub fn blame(ctx: &mut CommandContext, ecosystem: Option<&str>) -> Result<(), CliError> {
    let commit = resolve_commit(ctx, None)?;
    let entries = queries::blame(ctx.store, &commit, ecosystem)?;
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.manifest_path.clone(),
                e.name.clone(),
                e.requirement.clone(),
                e.commit_sha[..e.commit_sha.len().min(10)].to_string(),
                e.author_name.clone(),
                e.committed_at.to_rfc3339(),
            ]
        })
        .collect();
    let text = table(&["manifest", "name", "requirement", "commit", "author", "committed_at"], &rows);
    ctx.emit(text, json!(entries));
    Ok(())
}

pub fn stale(ctx: &mut CommandContext, days: Option<i64>, ecosystem: Option<&str>) -> Result<(), CliError> {
    let commit = resolve_commit(ctx, None)?;
    let entries = queries::stale(ctx.store, &commit, ecosystem, days)?;
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.manifest_path.clone(),
                e.name.clone(),
                e.requirement.clone(),
                e.days_since_change.to_string(),
            ]
        })
        .collect();
    let text = table(&["manifest", "name", "requirement", "days_since_change"], &rows);
    ctx.emit(text, json!(entries));
    Ok(())
}

pub fn stats(
    ctx: &mut CommandContext,
    by: StatsByArg,
    by_author: bool,
    ecosystem: Option<&str>,
    since: Option<&str>,
    until: Option<&str>,
) -> Result<(), CliError> {
    let group = if by_author { StatsByArg::Author } else { by };
    let group = match group {
        StatsByArg::Author => queries::StatsGroup::Author,
        StatsByArg::Ecosystem => queries::StatsGroup::Ecosystem,
        StatsByArg::Manifest => queries::StatsGroup::Manifest,
        StatsByArg::Name => queries::StatsGroup::Name,
    };
    let since = since.map(parse_date).transpose()?;
    let until = until.map(parse_date).transpose()?;
    let entries = queries::stats(ctx.store, group, ecosystem, since, until)?;
    let rows: Vec<Vec<String>> = entries.iter().map(|e| vec![e.key.clone(), e.count.to_string()]).collect();
    let text = table(&["key", "count"], &rows);
    ctx.emit(text, json!(entries));
    Ok(())
}

pub fn diff(
    ctx: &mut CommandContext,
    from: Option<&str>,
    to: Option<&str>,
    range: Option<&str>,
) -> Result<(), CliError> {
    let (from_ref, to_ref) = resolve_diff_refs(from, to, range)?;
    let from_sha = updater::lazy_materialize(ctx.repo, ctx.git, ctx.store, &from_ref)?;
    let to_sha = updater::lazy_materialize(ctx.repo, ctx.git, ctx.store, &to_ref)?;
    let from_commit = ctx
        .store
        .find_commit_by_sha(&from_sha)?
        .ok_or(QueryError::CommitNotFound { sha: from_sha })?;
    let to_commit = ctx
        .store
        .find_commit_by_sha(&to_sha)?
        .ok_or(QueryError::CommitNotFound { sha: to_sha })?;

    let from_deps = reconstructor::deps_at_commit(ctx.store, &from_commit)?;
    let to_deps = reconstructor::deps_at_commit(ctx.store, &to_commit)?;
    let entries = queries::diff(&from_deps, &to_deps);

    let painter = ctx.painter();
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            let change = match e.change_type {
                "added" => painter.added(e.change_type),
                "removed" => painter.removed(e.change_type),
                _ => painter.modified(e.change_type),
            };
            vec![
                e.manifest_path.clone(),
                e.name.clone(),
                change,
                e.previous_requirement.clone().unwrap_or_default(),
                e.requirement.clone().unwrap_or_default(),
            ]
        })
        .collect();
    let text = table(&["manifest", "name", "change", "from", "to"], &rows);
    ctx.emit(text, json!(entries));
    Ok(())
}

pub fn show(ctx: &mut CommandContext, reference: &str) -> Result<(), CliError> {
    let sha = updater::lazy_materialize(ctx.repo, ctx.git, ctx.store, reference)?;
    let changes = queries::show(ctx.store, &sha)?;
    let rows: Vec<Vec<String>> = changes
        .iter()
        .map(|c| {
            vec![
                c.manifest_path.clone(),
                c.name.clone(),
                c.change_type.clone(),
                c.previous_requirement.clone().unwrap_or_default(),
                c.requirement.clone(),
            ]
        })
        .collect();
    let text = table(&["manifest", "name", "change", "from", "to"], &rows);
    ctx.emit(text, json!(changes));
    Ok(())
}

pub fn where_cmd(
    ctx: &mut CommandContext,
    name: &str,
    context_lines: usize,
    ecosystem: Option<&str>,
) -> Result<(), CliError> {
    let paths = queries::candidate_manifest_paths(ctx.store, name, ecosystem)?;
    #[derive(serde::Serialize)]
    struct Hit {
        path: String,
        #[serde(rename = "match")]
        line_match: workingtree::LineMatch,
    }
    let mut hits = Vec::new();
    for path in &paths {
        for line_match in workingtree::grep_line_numbers(&ctx.repo.root, path, name, context_lines) {
            hits.push(Hit { path: path.clone(), line_match });
        }
    }
    let rows: Vec<Vec<String>> = hits
        .iter()
        .map(|h| vec![h.path.clone(), h.line_match.line_number.to_string(), h.line_match.text.clone()])
        .collect();
    let text = table(&["path", "line", "text"], &rows);
    ctx.emit(text, json!(hits));
    Ok(())
}

pub fn log(
    ctx: &mut CommandContext,
    author: Option<&str>,
    ecosystem: Option<&str>,
    limit: Option<usize>,
) -> Result<(), CliError> {
    let entries = queries::log(ctx.store, author, ecosystem, limit)?;
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|(commit, count)| {
            vec![
                commit.sha[..commit.sha.len().min(10)].to_string(),
                commit.committed_at.to_rfc3339(),
                commit.author_name.clone(),
                count.to_string(),
                commit.message.lines().next().unwrap_or("").to_string(),
            ]
        })
        .collect();
    let text = table(&["commit", "committed_at", "author", "changes", "message"], &rows);
    let json_rows: Vec<_> = entries
        .iter()
        .map(|(commit, count)| {
            json!({
                "sha": commit.sha,
                "committed_at": commit.committed_at,
                "author_name": commit.author_name,
                "author_email": commit.author_email,
                "message": commit.message,
                "change_count": count,
            })
        })
        .collect();
    ctx.emit(text, json!(json_rows));
    Ok(())
}

pub fn info(ctx: &mut CommandContext) -> Result<(), CliError> {
    let schema_version = ctx.store.schema_version()?;
    let row_counts = ctx.store.row_counts()?;
    let branches = ctx.store.branches()?;

    let mut text = String::new();
    text.push_str(&format!("schema version: {:?}\n", schema_version));
    text.push_str(&format!(
        "rows: {} branches, {} commits ({} with changes), {} manifests, {} changes, {} snapshots\n",
        row_counts.branches,
        row_counts.commits,
        row_counts.change_bearing_commits,
        row_counts.manifests,
        row_counts.dependency_changes,
        row_counts.dependency_snapshots
    ));
    for branch in &branches {
        text.push_str(&format!("  {} -> {}\n", branch.name, branch.last_analyzed_sha));
    }

    ctx.emit(
        text.trim_end().to_string(),
        json!({
            "schema_version": schema_version,
            "row_counts": {
                "branches": row_counts.branches,
                "commits": row_counts.commits,
                "change_bearing_commits": row_counts.change_bearing_commits,
                "manifests": row_counts.manifests,
                "dependency_changes": row_counts.dependency_changes,
                "dependency_snapshots": row_counts.dependency_snapshots,
            },
            "branches": branches.iter().map(|b| json!({
                "name": b.name,
                "last_analyzed_sha": b.last_analyzed_sha,
            })).collect::<Vec<_>>(),
        }),
    );
    Ok(())
}

/// `upgrade`: detects a schema-version mismatch and wipes-and-reindexes.
/// Prompts for confirmation unless `--yes`/non-quiet-piped; a store that's
/// already current is a no-op.
pub fn upgrade(ctx: &mut CommandContext, branch: Option<&str>, assume_yes: bool) -> Result<(), CliError> {
    let needs_upgrade = !matches!(
        ctx.store.check_schema_version("git-pkgs"),
        Ok(()) | Err(pkgs_store::StoreError::NotInitialized { .. })
    );
    if !needs_upgrade {
        ctx.emit("schema is already up to date".to_string(), json!({"upgraded": false}));
        return Ok(());
    }

    if !assume_yes {
        print!("schema is outdated; wipe and reindex? [y/N] ");
        std::io::stdout().flush().ok();
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer).ok();
        if !answer.trim().eq_ignore_ascii_case("y") {
            return Err(CliError::Other("upgrade aborted".to_string()));
        }
    }

    let branch_name = resolve_branch_name(ctx.repo, ctx.git, branch)?;
    let mut sink = build_sink(ctx.config.quiet, ctx.config.json);
    let cancel = crate::signals::install()?;
    let summary = indexer::init(ctx.repo, ctx.git, ctx.store, ctx.config, &branch_name, None, true, &cancel, sink.as_mut())?;
    ctx.emit(
        format!("upgraded and reindexed '{}': {} commits", summary.branch, summary.commits_indexed),
        json!({"upgraded": true, "commits_indexed": summary.commits_indexed}),
    );
    Ok(())
}

fn resolve_branch_name(repo: &RepoHandle, git: &GitCli, branch: Option<&str>) -> Result<String, CliError> {
    match branch {
        Some(name) => Ok(name.to_string()),
        None => Ok(pkgs_git::default_branch(repo, git)?),
    }
}

fn resolve_commit(ctx: &mut CommandContext, commit_ref: Option<&str>) -> Result<pkgs_store::CommitRow, CliError> {
    let reference = commit_ref.unwrap_or("HEAD");
    let sha = updater::lazy_materialize(ctx.repo, ctx.git, ctx.store, reference)?;
    ctx.store
        .find_commit_by_sha(&sha)
        .map_err(CliError::from)?
        .ok_or_else(|| CliError::from(QueryError::CommitNotFound { sha }))
}

fn resolve_diff_refs(
    from: Option<&str>,
    to: Option<&str>,
    range: Option<&str>,
) -> Result<(String, String), CliError> {
    if let Some(range) = range {
        if let Some((a, b)) = split_range(range) {
            return Ok((a, b));
        }
        return Ok((range.to_string(), "HEAD".to_string()));
    }
    let from = from.ok_or_else(|| CliError::Usage("diff requires --from REF or an A..B range".to_string()))?;
    let to = to.unwrap_or("HEAD").to_string();
    Ok((from.to_string(), to))
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, CliError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let dt = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CliError::Usage(format!("invalid date '{value}'")))?;
        return Ok(Utc.from_utc_datetime(&dt));
    }
    Err(CliError::Usage(format!(
        "could not parse '{value}' as a date (expected RFC3339 or YYYY-MM-DD)"
    )))
}

pub fn run_textconv(path: &std::path::Path) -> Result<(), CliError> {
    textconv::run(path).map_err(|e| CliError::Other(e.to_string()))
}
