//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the persisted queue and seen set that make a crawl resumable
//! - `CrawlOutcome`: the per-URL state machine (queued, fetching, terminal outcome)

mod crawl_state;
mod outcome;

pub use crawl_state::{CrawlState, QueueEntry, MAX_QUEUE_SIZE, MAX_SEEN_SIZE, STATE_SCHEMA_VERSION};
pub use outcome::CrawlOutcome;

use crate::ErrorCode;
use thiserror::Error;

/// Crawl-state persistence errors
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Crawl state at {path} is corrupted: {reason}")]
    Corrupted { path: String, reason: String },

    #[error("Crawl state at {path} has schema version {found}, expected {expected}")]
    SchemaMismatch {
        path: String,
        found: u32,
        expected: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Corrupted { .. } => ErrorCode::StateCorrupted,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::Io(_) => ErrorCode::IoError,
        }
    }
}

pub type StateResult<T> = std::result::Result<T, StateError>;
