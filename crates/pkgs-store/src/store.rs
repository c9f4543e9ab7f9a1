use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use crate::error::{classify, StoreError};
use crate::models::{
    BranchRow, CommitRow, DependencyChangeRow, DependencySnapshotRow, ManifestRow, RowCounts,
};
use crate::schema::{CREATE_TABLES, DEFERRED_INDEXES, DROP_TABLES, SCHEMA_VERSION};

/// The change/snapshot store: schema DDL and
/// versioning, connection/pragma tuning, and the read-side queries behind
/// the reconstructor and query surface. Bulk writes go through
/// `batch::*` functions against a `Transaction` borrowed from
/// `SqliteStore::transaction`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(classify)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    /// Idempotent DDL (`CREATE TABLE IF NOT EXISTS`) plus seeding the
    /// `schema_info` row when absent. Never migrates an existing
    /// version-mismatched store in place (Design Note "Schema upgrade").
    pub fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_TABLES)?;
        let existing = self.schema_version()?;
        if existing.is_none() {
            self.conn.execute(
                "INSERT INTO schema_info (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }
        Ok(())
    }

    pub fn schema_version(&self) -> Result<Option<i64>, StoreError> {
        let version = self
            .conn
            .query_row("SELECT version FROM schema_info LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(version)
    }

    /// Refuses to proceed on any schema-version mismatch. Returns
    /// `NotInitialized` when the store has never been migrated at all.
    pub fn check_schema_version(&self, db_path: &str) -> Result<(), StoreError> {
        match self.schema_version()? {
            None => Err(StoreError::NotInitialized {
                path: db_path.to_string(),
            }),
            Some(stored) if stored != SCHEMA_VERSION => Err(StoreError::SchemaOutdated {
                stored,
                code: SCHEMA_VERSION,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Drops and recreates every table (`--force`, or an `upgrade` that
    /// chooses to wipe-and-rebuild rather than refuse).
    pub fn wipe(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(DROP_TABLES)?;
        self.migrate()
    }

    /// Tunables applied for the duration of a bulk load (`init`): WAL
    /// journaling, relaxed durability, a large page cache.
    pub fn begin_bulk_load(&self) -> Result<(), StoreError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "OFF")?;
        self.conn.pragma_update(None, "cache_size", -65536)?;
        debug!("bulk-load pragmas applied (WAL, synchronous=OFF, 64MB cache)");
        Ok(())
    }

    /// Restores durable pragmas and creates the deferred secondary
    /// indexes. Called once after the initial walk completes, or never for
    /// incremental `update` runs (which never call `begin_bulk_load` in the
    /// first place).
    pub fn end_bulk_load(&self) -> Result<(), StoreError> {
        self.create_deferred_indexes()?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!("deferred indexes created, durable pragmas restored");
        Ok(())
    }

    pub fn create_deferred_indexes(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(DEFERRED_INDEXES)?;
        Ok(())
    }

    /// Opens a transaction for the caller's batch-insert pipeline
    /// (`batch::*` functions). Every buffered flush from the indexer and
    /// every single-commit update from the updater goes through one of
    /// these ("batches are transactions — either entirely
    /// present or entirely absent after an interruption").
    pub fn transaction(&mut self) -> Result<Transaction<'_>, StoreError> {
        self.conn.transaction().map_err(classify)
    }

    // ---- branches -----------------------------------------------------

    pub fn branch(&self, name: &str) -> Result<Option<BranchRow>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, last_analyzed_sha FROM branches WHERE name = ?1",
                params![name],
                |row| {
                    Ok(BranchRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        last_analyzed_sha: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn branches(&self) -> Result<Vec<BranchRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, last_analyzed_sha FROM branches ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BranchRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    last_analyzed_sha: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---- commits --------------------------------------------------------

    pub fn find_commit_by_sha(&self, sha: &str) -> Result<Option<CommitRow>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, sha, message, author_name, author_email, committed_at, has_dependency_changes
                 FROM commits WHERE sha = ?1",
                params![sha],
                row_to_commit,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn commit_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?)
    }

    /// the latest commit at or before `(at, at_or_before_id)`
    /// that has at least one persisted snapshot row, ties broken on id so the
    /// base never sits "after" the target commit in its own timestamp tie
    /// group, so reconstruction is deterministic regardless of which
    /// snapshot ends up chosen as the base. Decision recorded in DESIGN.md:
    /// searched globally across the commit set (a sha is shared across
    /// branches), not
    /// restricted to one branch's `branch_commits` rows.
    pub fn latest_snapshot_commit_at(
        &self,
        at: DateTime<Utc>,
        at_or_before_id: i64,
    ) -> Result<Option<CommitRow>, StoreError> {
        self.conn
            .query_row(
                "SELECT c.id, c.sha, c.message, c.author_name, c.author_email, c.committed_at, c.has_dependency_changes
                 FROM commits c
                 WHERE (c.committed_at < ?1 OR (c.committed_at = ?1 AND c.id <= ?2))
                   AND EXISTS (SELECT 1 FROM dependency_snapshots s WHERE s.commit_id = c.id)
                 ORDER BY c.committed_at DESC, c.id DESC
                 LIMIT 1",
                params![at.to_rfc3339(), at_or_before_id],
                row_to_commit,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn load_snapshot_rows(&self, commit_id: i64) -> Result<Vec<DependencySnapshotRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT m.path, m.kind, s.name, s.ecosystem, s.requirement, s.dependency_type
             FROM dependency_snapshots s
             JOIN manifests m ON m.id = s.manifest_id
             WHERE s.commit_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![commit_id], |row| {
                Ok(DependencySnapshotRow {
                    manifest_path: row.get(0)?,
                    manifest_kind: row.get(1)?,
                    name: row.get(2)?,
                    ecosystem: row.get(3)?,
                    requirement: row.get(4)?,
                    dependency_type: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// changes strictly after `(after, after_id)` up to and
    /// including `(up_to, up_to_id)`, ordered `(committed_at, commit.id)`
    /// ascending. The id tie-breaks keep the window exact when several
    /// commits share one timestamp.
    pub fn load_changes_between(
        &self,
        after: Option<(DateTime<Utc>, i64)>,
        up_to: DateTime<Utc>,
        up_to_id: i64,
    ) -> Result<Vec<DependencyChangeRow>, StoreError> {
        let (after_ts, after_id) = after.unwrap_or((DateTime::<Utc>::MIN_UTC, i64::MIN));
        let mut stmt = self.conn.prepare(
            "SELECT ch.id, ch.commit_id, c.sha, c.committed_at, c.author_name, c.author_email,
                    m.path, ch.name, ch.ecosystem, ch.change_type, ch.requirement,
                    ch.previous_requirement, ch.dependency_type
             FROM dependency_changes ch
             JOIN commits c ON c.id = ch.commit_id
             JOIN manifests m ON m.id = ch.manifest_id
             WHERE (c.committed_at > ?1 OR (c.committed_at = ?1 AND c.id > ?2))
               AND (c.committed_at < ?3 OR (c.committed_at = ?3 AND c.id <= ?4))
             ORDER BY c.committed_at ASC, c.id ASC, ch.id ASC",
        )?;
        let rows = stmt
            .query_map(
                params![after_ts.to_rfc3339(), after_id, up_to.to_rfc3339(), up_to_id],
                row_to_change,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `show`: every change recorded against one commit sha.
    pub fn load_changes_for_sha(&self, sha: &str) -> Result<Vec<DependencyChangeRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ch.id, ch.commit_id, c.sha, c.committed_at, c.author_name, c.author_email,
                    m.path, ch.name, ch.ecosystem, ch.change_type, ch.requirement,
                    ch.previous_requirement, ch.dependency_type
             FROM dependency_changes ch
             JOIN commits c ON c.id = ch.commit_id
             JOIN manifests m ON m.id = ch.manifest_id
             WHERE c.sha = ?1
             ORDER BY ch.id ASC",
        )?;
        let rows = stmt
            .query_map(params![sha], row_to_change)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `history`: changes for a name, optionally filtered by
    /// ecosystem/author/date range, newest-last (committed-time order).
    #[allow(clippy::too_many_arguments)]
    pub fn history(
        &self,
        name: Option<&str>,
        ecosystem: Option<&str>,
        author: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<DependencyChangeRow>, StoreError> {
        let mut sql = String::from(
            "SELECT ch.id, ch.commit_id, c.sha, c.committed_at, c.author_name, c.author_email,
                    m.path, ch.name, ch.ecosystem, ch.change_type, ch.requirement,
                    ch.previous_requirement, ch.dependency_type
             FROM dependency_changes ch
             JOIN commits c ON c.id = ch.commit_id
             JOIN manifests m ON m.id = ch.manifest_id
             WHERE 1 = 1",
        );
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(name) = name {
            sql.push_str(" AND ch.name = ?");
            bound.push(Box::new(name.to_string()));
        }
        if let Some(ecosystem) = ecosystem {
            sql.push_str(" AND ch.ecosystem = ?");
            bound.push(Box::new(ecosystem.to_string()));
        }
        if let Some(author) = author {
            sql.push_str(" AND (c.author_name = ? OR c.author_email = ?)");
            bound.push(Box::new(author.to_string()));
            bound.push(Box::new(author.to_string()));
        }
        if let Some(since) = since {
            sql.push_str(" AND c.committed_at >= ?");
            bound.push(Box::new(since.to_rfc3339()));
        }
        if let Some(until) = until {
            sql.push_str(" AND c.committed_at <= ?");
            bound.push(Box::new(until.to_rfc3339()));
        }
        sql.push_str(" ORDER BY c.committed_at ASC, c.id ASC, ch.id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_change)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `log`: change-bearing commits with their change counts.
    pub fn log(
        &self,
        author: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<(CommitRow, i64)>, StoreError> {
        let mut sql = String::from(
            "SELECT c.id, c.sha, c.message, c.author_name, c.author_email, c.committed_at,
                    c.has_dependency_changes,
                    (SELECT COUNT(*) FROM dependency_changes ch WHERE ch.commit_id = c.id) AS change_count
             FROM commits c
             WHERE c.has_dependency_changes = 1",
        );
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(author) = author {
            sql.push_str(" AND (c.author_name = ? OR c.author_email = ?)");
            bound.push(Box::new(author.to_string()));
            bound.push(Box::new(author.to_string()));
        }
        sql.push_str(" ORDER BY c.committed_at DESC, c.id DESC");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((
                    CommitRow {
                        id: row.get(0)?,
                        sha: row.get(1)?,
                        message: row.get(2)?,
                        author_name: row.get(3)?,
                        author_email: row.get(4)?,
                        committed_at: parse_rfc3339(row.get::<_, String>(5)?)?,
                        has_dependency_changes: row.get::<_, i64>(6)? != 0,
                    },
                    row.get(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `where`: manifest paths where `name` currently appears in
    /// the live snapshot. Store-only half of the split (the file-system
    /// scan for line numbers lives in `pkgs`'s `workingtree` module).
    pub fn manifest_paths_for_name(&self, name: &str, ecosystem: Option<&str>) -> Result<Vec<String>, StoreError> {
        let mut sql = String::from(
            "SELECT DISTINCT m.path
             FROM dependency_snapshots s
             JOIN manifests m ON m.id = s.manifest_id
             WHERE s.name = ?",
        );
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(name.to_string())];
        if let Some(ecosystem) = ecosystem {
            sql.push_str(" AND s.ecosystem = ?");
            bound.push(Box::new(ecosystem.to_string()));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `stats`: count aggregations by author/ecosystem/manifest/name.
    pub fn stats_by_author(&self) -> Result<Vec<(String, i64)>, StoreError> {
        self.grouped_counts("c.author_name", "c.author_name")
    }

    pub fn stats_by_ecosystem(&self) -> Result<Vec<(String, i64)>, StoreError> {
        self.grouped_counts("ch.ecosystem", "ch.ecosystem")
    }

    pub fn stats_by_manifest(&self) -> Result<Vec<(String, i64)>, StoreError> {
        self.grouped_counts("m.path", "m.path")
    }

    pub fn stats_by_name(&self) -> Result<Vec<(String, i64)>, StoreError> {
        self.grouped_counts("ch.name", "ch.name")
    }

    fn grouped_counts(&self, select_expr: &str, group_expr: &str) -> Result<Vec<(String, i64)>, StoreError> {
        let sql = format!(
            "SELECT {select_expr}, COUNT(*) FROM dependency_changes ch
             JOIN commits c ON c.id = ch.commit_id
             JOIN manifests m ON m.id = ch.manifest_id
             GROUP BY {group_expr}
             ORDER BY COUNT(*) DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn manifest_by_path(&self, path: &str) -> Result<Option<ManifestRow>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, path, ecosystem, kind FROM manifests WHERE path = ?1",
                params![path],
                |row| {
                    Ok(ManifestRow {
                        id: row.get(0)?,
                        path: row.get(1)?,
                        ecosystem: row.get(2)?,
                        kind: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn row_counts(&self) -> Result<RowCounts, StoreError> {
        Ok(RowCounts {
            branches: self.conn.query_row("SELECT COUNT(*) FROM branches", [], |r| r.get(0))?,
            commits: self.conn.query_row("SELECT COUNT(*) FROM commits", [], |r| r.get(0))?,
            change_bearing_commits: self.conn.query_row(
                "SELECT COUNT(*) FROM commits WHERE has_dependency_changes = 1",
                [],
                |r| r.get(0),
            )?,
            manifests: self.conn.query_row("SELECT COUNT(*) FROM manifests", [], |r| r.get(0))?,
            dependency_changes: self
                .conn
                .query_row("SELECT COUNT(*) FROM dependency_changes", [], |r| r.get(0))?,
            dependency_snapshots: self
                .conn
                .query_row("SELECT COUNT(*) FROM dependency_snapshots", [], |r| r.get(0))?,
        })
    }
}

fn row_to_commit(row: &rusqlite::Row) -> rusqlite::Result<CommitRow> {
    Ok(CommitRow {
        id: row.get(0)?,
        sha: row.get(1)?,
        message: row.get(2)?,
        author_name: row.get(3)?,
        author_email: row.get(4)?,
        committed_at: parse_rfc3339(row.get::<_, String>(5)?)?,
        has_dependency_changes: row.get::<_, i64>(6)? != 0,
    })
}

fn row_to_change(row: &rusqlite::Row) -> rusqlite::Result<DependencyChangeRow> {
    Ok(DependencyChangeRow {
        id: row.get(0)?,
        commit_id: row.get(1)?,
        commit_sha: row.get(2)?,
        committed_at: parse_rfc3339(row.get::<_, String>(3)?)?,
        author_name: row.get(4)?,
        author_email: row.get(5)?,
        manifest_path: row.get(6)?,
        name: row.get(7)?,
        ecosystem: row.get(8)?,
        change_type: row.get(9)?,
        requirement: row.get(10)?,
        previous_requirement: row.get(11)?,
        dependency_type: row.get(12)?,
    })
}

fn parse_rfc3339(value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(crate::error::StoreError::TimestampParse { value, source }),
            )
        })
}

/// upserts a branch row inside the caller's
/// transaction. A free function rather than an `&self` method — while a
/// `Transaction` borrowed from `SqliteStore::transaction` is alive, the
/// store itself is mutably borrowed, so no other method taking `&self` or
/// `&mut self` can run until the transaction is committed or dropped.
pub fn upsert_branch(tx: &Transaction, name: &str, now: DateTime<Utc>) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT INTO branches (name, last_analyzed_sha, created_at, updated_at)
         VALUES (?1, '', ?2, ?2)
         ON CONFLICT(name) DO UPDATE SET updated_at = excluded.updated_at",
        params![name, now.to_rfc3339()],
    )?;
    let id = tx.query_row(
        "SELECT id FROM branches WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Same rationale as `upsert_branch`: a free function over `&Transaction`.
pub fn set_branch_checkpoint(
    tx: &Transaction,
    branch_id: i64,
    sha: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE branches SET last_analyzed_sha = ?1, updated_at = ?2 WHERE id = ?3",
        params![sha, now.to_rfc3339(), branch_id],
    )?;
    Ok(())
}
