//! Storage traits and error types

use crate::state::CrawlOutcome;
use crate::storage::{OutcomeRecord, RunRecord, RunStatus};
use crate::ErrorCode;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Unknown value in ledger column {column}: {value}")]
    UnknownValue { column: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::IoError
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Ledger of crawl runs and per-URL outcomes
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run in the `running` status
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Closes a run with its final status and document count
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        documents_indexed: u64,
    ) -> StorageResult<()>;

    // ===== Outcomes =====

    /// Records the terminal outcome of a URL, replacing any earlier outcome
    /// for the same URL within the run
    fn record_outcome(
        &mut self,
        run_id: i64,
        url: &str,
        domain: &str,
        depth: u32,
        outcome: CrawlOutcome,
        detail: Option<&str>,
    ) -> StorageResult<()>;

    /// Counts outcomes of a run by kind
    fn count_outcomes(&self, run_id: i64) -> StorageResult<HashMap<CrawlOutcome, u64>>;

    /// Most recent failed or skipped outcomes of a run, newest first
    fn recent_failures(&self, run_id: i64, limit: usize) -> StorageResult<Vec<OutcomeRecord>>;
}
