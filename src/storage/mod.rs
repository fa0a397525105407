//! Storage module for the crawl ledger
//!
//! The ledger is an SQLite database that records every crawl run and the
//! terminal outcome of each URL the run attempted. It is observability
//! only: the index and crawl-state files never depend on it.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::CrawlOutcome;
use std::path::Path;

/// Initializes or opens the ledger database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub documents_indexed: u64,
}

/// A URL's recorded terminal outcome
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub url: String,
    pub domain: String,
    pub depth: u32,
    pub outcome: CrawlOutcome,
    pub detail: Option<String>,
    pub recorded_at: String,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
