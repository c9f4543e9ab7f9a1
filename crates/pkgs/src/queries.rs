//! Read-only command surface: list, history,
//! blame, stale, stats, diff, show, log, and the store half of `where`.
//! Every function here takes an already-open `&SqliteStore` and returns
//! plain data — rendering to a terminal or to JSON is the caller's job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pkgs_core::LiveDependency;
use pkgs_store::{CommitRow, DependencyChangeRow, SqliteStore};
use serde::Serialize;

use crate::error::QueryError;
use crate::reconstructor::deps_at_sha;

/// `list`: the live dependency set at one commit, optionally
/// narrowed by ecosystem or manifest path.
pub fn list(
    store: &SqliteStore,
    commit: &CommitRow,
    ecosystem: Option<&str>,
    manifest: Option<&str>,
) -> Result<Vec<LiveDependency>, QueryError> {
    let mut deps = deps_at_sha(store, commit.id, commit.committed_at)?;
    if let Some(ecosystem) = ecosystem {
        deps.retain(|d| d.ecosystem.as_str() == ecosystem);
    }
    if let Some(manifest) = manifest {
        deps.retain(|d| d.manifest_path == manifest);
    }
    Ok(deps)
}

/// `history`: raw change rows for a name, newest-last.
#[allow(clippy::too_many_arguments)]
pub fn history(
    store: &SqliteStore,
    name: Option<&str>,
    ecosystem: Option<&str>,
    author: Option<&str>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<Vec<DependencyChangeRow>, QueryError> {
    Ok(store.history(name, ecosystem, author, since, until)?)
}

/// A dependency's current requirement, paired with the change that first
/// introduced it (`blame`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlameEntry {
    pub manifest_path: String,
    pub name: String,
    pub requirement: String,
    pub commit_sha: String,
    pub committed_at: DateTime<Utc>,
    pub author_name: String,
    pub author_email: String,
}

/// `blame`: for every dependency live at `commit`, the change that first
/// introduced it to its manifest — the earliest `added` (or, lacking one,
/// earliest `modified`) change on record, never the most recent one.
pub fn blame(
    store: &SqliteStore,
    commit: &CommitRow,
    ecosystem: Option<&str>,
) -> Result<Vec<BlameEntry>, QueryError> {
    let current = deps_at_sha(store, commit.id, commit.committed_at)?;
    let mut out = Vec::with_capacity(current.len());
    for dep in current {
        if let Some(filter) = ecosystem {
            if dep.ecosystem.as_str() != filter {
                continue;
            }
        }
        let mut changes = store.history(
            Some(&dep.name),
            Some(dep.ecosystem.as_str()),
            None,
            None,
            Some(commit.committed_at),
        )?;
        changes.retain(|c| c.manifest_path == dep.manifest_path && c.change_type != "removed");

        // `changes` is ordered ascending by committed-time, so its first
        // element is the earliest surviving change — the one that introduced
        // the dependency, not whichever one most recently touched it.
        let origin: Option<&DependencyChangeRow> = changes.first();

        if let Some(origin) = origin {
            out.push(BlameEntry {
                manifest_path: dep.manifest_path,
                name: dep.name,
                requirement: dep.requirement,
                commit_sha: origin.commit_sha.clone(),
                committed_at: origin.committed_at,
                author_name: origin.author_name.clone(),
                author_email: origin.author_email.clone(),
            });
        }
    }
    out.sort_by(|a, b| (a.manifest_path.as_str(), a.name.as_str()).cmp(&(b.manifest_path.as_str(), b.name.as_str())));
    Ok(out)
}

/// A dependency that hasn't changed in a while (`stale`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleEntry {
    pub manifest_path: String,
    pub name: String,
    pub requirement: String,
    pub last_changed_at: DateTime<Utc>,
    pub days_since_change: i64,
}

/// `stale`: live dependencies whose most recent change predates
/// `commit` by at least `min_days` (default 0 — every dependency is
/// "stale" relative to its own last touch, ordered oldest-first).
pub fn stale(
    store: &SqliteStore,
    commit: &CommitRow,
    ecosystem: Option<&str>,
    min_days: Option<i64>,
) -> Result<Vec<StaleEntry>, QueryError> {
    let current = deps_at_sha(store, commit.id, commit.committed_at)?;
    let mut out = Vec::new();
    for dep in current {
        if let Some(filter) = ecosystem {
            if dep.ecosystem.as_str() != filter {
                continue;
            }
        }
        let changes = store.history(
            Some(&dep.name),
            Some(dep.ecosystem.as_str()),
            None,
            None,
            Some(commit.committed_at),
        )?;
        let last_changed_at = changes
            .into_iter()
            .filter(|c| c.manifest_path == dep.manifest_path)
            .map(|c| c.committed_at)
            .max();
        let Some(last_changed_at) = last_changed_at else {
            continue;
        };
        let days_since_change = (commit.committed_at - last_changed_at).num_days();
        if min_days.map_or(true, |min| days_since_change >= min) {
            out.push(StaleEntry {
                manifest_path: dep.manifest_path,
                name: dep.name,
                requirement: dep.requirement,
                last_changed_at,
                days_since_change,
            });
        }
    }
    out.sort_by(|a, b| {
        b.days_since_change
            .cmp(&a.days_since_change)
            .then_with(|| a.manifest_path.cmp(&b.manifest_path))
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(out)
}

/// `stats`: which column to group change counts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsGroup {
    Author,
    Ecosystem,
    Manifest,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsEntry {
    pub key: String,
    pub count: i64,
}

/// `stats`: change counts grouped by `group`, optionally
/// narrowed by ecosystem and/or a `[since, until]` commit-time window.
/// Built on `store.history` rather than the store's ungrouped
/// `stats_by_*` helpers, since those don't take a date range.
pub fn stats(
    store: &SqliteStore,
    group: StatsGroup,
    ecosystem: Option<&str>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<Vec<StatsEntry>, QueryError> {
    let changes = store.history(None, ecosystem, None, since, until)?;
    let mut counts: HashMap<String, i64> = HashMap::new();
    for change in &changes {
        let key = match group {
            StatsGroup::Author => change.author_name.clone(),
            StatsGroup::Ecosystem => change.ecosystem.clone(),
            StatsGroup::Manifest => change.manifest_path.clone(),
            StatsGroup::Name => change.name.clone(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut out: Vec<StatsEntry> = counts
        .into_iter()
        .map(|(key, count)| StatsEntry { key, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    Ok(out)
}

/// One entry of a `diff` between two dependency sets. A pure function over
/// two already-reconstructed snapshots — it never touches the store itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub manifest_path: String,
    pub name: String,
    pub ecosystem: String,
    pub change_type: &'static str,
    pub previous_requirement: Option<String>,
    pub requirement: Option<String>,
}

pub fn diff(from: &[LiveDependency], to: &[LiveDependency]) -> Vec<DiffEntry> {
    let from_map: HashMap<(&str, &str), &LiveDependency> = from
        .iter()
        .map(|d| ((d.manifest_path.as_str(), d.name.as_str()), d))
        .collect();
    let to_map: HashMap<(&str, &str), &LiveDependency> = to
        .iter()
        .map(|d| ((d.manifest_path.as_str(), d.name.as_str()), d))
        .collect();

    let mut out = Vec::new();
    for (key, dep) in &to_map {
        match from_map.get(key) {
            None => out.push(DiffEntry {
                manifest_path: dep.manifest_path.clone(),
                name: dep.name.clone(),
                ecosystem: dep.ecosystem.as_str().to_string(),
                change_type: "added",
                previous_requirement: None,
                requirement: Some(dep.requirement.clone()),
            }),
            Some(prev) => {
                if prev.requirement != dep.requirement || prev.dependency_type != dep.dependency_type {
                    out.push(DiffEntry {
                        manifest_path: dep.manifest_path.clone(),
                        name: dep.name.clone(),
                        ecosystem: dep.ecosystem.as_str().to_string(),
                        change_type: "modified",
                        previous_requirement: Some(prev.requirement.clone()),
                        requirement: Some(dep.requirement.clone()),
                    });
                }
            }
        }
    }
    for (key, dep) in &from_map {
        if !to_map.contains_key(key) {
            out.push(DiffEntry {
                manifest_path: dep.manifest_path.clone(),
                name: dep.name.clone(),
                ecosystem: dep.ecosystem.as_str().to_string(),
                change_type: "removed",
                previous_requirement: Some(dep.requirement.clone()),
                requirement: None,
            });
        }
    }

    out.sort_by(|a, b| (a.manifest_path.as_str(), a.name.as_str()).cmp(&(b.manifest_path.as_str(), b.name.as_str())));
    out
}

/// `show`: every change recorded against one commit.
pub fn show(store: &SqliteStore, sha: &str) -> Result<Vec<DependencyChangeRow>, QueryError> {
    Ok(store.load_changes_for_sha(sha)?)
}

/// `log`: change-bearing commits with their change counts,
/// optionally narrowed to commits that touched a given ecosystem.
pub fn log(
    store: &SqliteStore,
    author: Option<&str>,
    ecosystem: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<(CommitRow, i64)>, QueryError> {
    let mut entries = if let Some(ecosystem) = ecosystem {
        let changes = store.history(None, Some(ecosystem), author, None, None)?;
        let mut counts: HashMap<i64, i64> = HashMap::new();
        for change in &changes {
            *counts.entry(change.commit_id).or_insert(0) += 1;
        }
        store
            .log(author, None)?
            .into_iter()
            .filter_map(|(commit, _)| counts.get(&commit.id).map(|&count| (commit, count)))
            .collect()
    } else {
        store.log(author, None)?
    };

    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    Ok(entries)
}

/// `where`: manifest paths where `name` currently appears in the
/// live snapshot. The filesystem half (line numbers in the working tree)
/// lives in `workingtree::grep_line_numbers`.
pub fn candidate_manifest_paths(
    store: &SqliteStore,
    name: &str,
    ecosystem: Option<&str>,
) -> Result<Vec<String>, QueryError> {
    Ok(store.manifest_paths_for_name(name, ecosystem)?)
}
