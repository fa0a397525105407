//! Full-text index module
//!
//! Documents are tokenized into per-field inverted indexes and ranked with
//! BM25. The whole index persists as one JSON file so the query tool can
//! load it without the crawler running.

mod document;
mod field;
mod search_index;
mod tokenizer;

pub use document::Document;
pub use search_index::{
    IndexStats, ScoredDocument, SearchIndex, SearchOptions, CONTENT_WEIGHT, DOMAIN_WEIGHT,
    INDEX_SCHEMA_VERSION, PREFIX_WEIGHT, TITLE_WEIGHT,
};
pub use tokenizer::{tokenize, tokenize_query};

pub(crate) use search_index::write_atomic;

use crate::ErrorCode;
use thiserror::Error;

/// Index load, save and search errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index not found at {0}")]
    NotFound(String),

    #[error("Index at {path} is corrupted: {reason}")]
    Corrupted { path: String, reason: String },

    #[error("Index at {path} has schema version {found}, expected {expected}")]
    SchemaMismatch {
        path: String,
        found: u32,
        expected: u32,
    },

    #[error("Query is empty")]
    MissingQuery,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::IndexNotFound,
            Self::Corrupted { .. } => ErrorCode::IndexCorrupted,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::MissingQuery => ErrorCode::MissingQuery,
            Self::Io(_) => ErrorCode::IoError,
        }
    }
}

pub type IndexResult<T> = std::result::Result<T, IndexError>;
