//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::CrawlOutcome;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{OutcomeRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the ledger database, creating parent directories
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let status: String = row.get(4)?;
    Ok((
        RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::Running,
            documents_indexed: row.get::<_, i64>(5)? as u64,
        },
        status,
    ))
}

fn with_status((mut run, status): (RunRecord, String)) -> StorageResult<RunRecord> {
    run.status = RunStatus::from_db_string(&status).ok_or(StorageError::UnknownValue {
        column: "runs.status",
        value: status,
    })?;
    Ok(run)
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, documents_indexed";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        with_status(row)
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?
            .map(with_status)
            .transpose()
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        documents_indexed: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, documents_indexed = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, documents_indexed as i64, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Outcomes =====

    fn record_outcome(
        &mut self,
        run_id: i64,
        url: &str,
        domain: &str,
        depth: u32,
        outcome: CrawlOutcome,
        detail: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO outcomes (run_id, url, domain, depth, outcome, detail, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(run_id, url) DO UPDATE SET
                 outcome = excluded.outcome,
                 detail = excluded.detail,
                 recorded_at = excluded.recorded_at",
            params![
                run_id,
                url,
                domain,
                depth,
                outcome.to_db_string(),
                detail,
                now
            ],
        )?;
        Ok(())
    }

    fn count_outcomes(&self, run_id: i64) -> StorageResult<HashMap<CrawlOutcome, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT outcome, COUNT(*) FROM outcomes WHERE run_id = ?1 GROUP BY outcome")?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = HashMap::new();
        for row in rows {
            let (outcome_str, count) = row?;
            let outcome =
                CrawlOutcome::from_db_string(&outcome_str).ok_or(StorageError::UnknownValue {
                    column: "outcomes.outcome",
                    value: outcome_str,
                })?;
            summary.insert(outcome, count as u64);
        }

        Ok(summary)
    }

    fn recent_failures(&self, run_id: i64, limit: usize) -> StorageResult<Vec<OutcomeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, domain, depth, outcome, detail, recorded_at
             FROM outcomes
             WHERE run_id = ?1 AND outcome != ?2
             ORDER BY id DESC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(
            params![run_id, CrawlOutcome::Indexed.to_db_string(), limit as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )?;

        let mut records = Vec::new();
        for row in rows {
            let (url, domain, depth, outcome_str, detail, recorded_at) = row?;
            let outcome =
                CrawlOutcome::from_db_string(&outcome_str).ok_or(StorageError::UnknownValue {
                    column: "outcomes.outcome",
                    value: outcome_str,
                })?;
            records.push(OutcomeRecord {
                url,
                domain,
                depth,
                outcome,
                detail,
                recorded_at,
            });
        }

        Ok(records)
    }
}
