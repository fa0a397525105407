//! Docsift: a curated-site crawler and offline full-text search index
//!
//! This crate crawls a whitelist of authoritative technical sites, extracts
//! clean article text, and stores it in a ranked index that the query tool
//! reads back from disk on every lookup.

pub mod config;
pub mod crawler;
pub mod extractor;
pub mod index;
pub mod output;
pub mod query;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Main error type for Docsift operations
#[derive(Debug, Error)]
pub enum DocsiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Crawl state error: {0}")]
    State(#[from] state::StateError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Another crawl holds the lock at {path}")]
    Locked { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocsiftError {
    /// Maps the error onto the user-facing error taxonomy
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(e) => e.code(),
            Self::Index(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Storage(_) => ErrorCode::IoError,
            Self::Url(_) => ErrorCode::ConfigInvalid,
            Self::Reqwest(_) => ErrorCode::FetchFailed,
            Self::Locked { .. } => ErrorCode::CrawlLocked,
            Self::Io(_) => ErrorCode::IoError,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    Missing(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Missing(_) => ErrorCode::ConfigMissing,
            _ => ErrorCode::ConfigInvalid,
        }
    }
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Stable error codes surfaced to operators and calling agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ConfigMissing,
    ConfigInvalid,
    IndexNotFound,
    IndexCorrupted,
    StateCorrupted,
    SchemaMismatch,
    MissingQuery,
    QueryTooLong,
    LimitExceeded,
    InvalidDomain,
    BlockedHost,
    RobotsDisallowed,
    FetchTimeout,
    FetchFailed,
    QualityRejected,
    CrawlLocked,
    IoError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "config_missing",
            Self::ConfigInvalid => "config_invalid",
            Self::IndexNotFound => "index_not_found",
            Self::IndexCorrupted => "index_corrupted",
            Self::StateCorrupted => "state_corrupted",
            Self::SchemaMismatch => "schema_mismatch",
            Self::MissingQuery => "missing_query",
            Self::QueryTooLong => "query_too_long",
            Self::LimitExceeded => "limit_exceeded",
            Self::InvalidDomain => "invalid_domain",
            Self::BlockedHost => "blocked_host",
            Self::RobotsDisallowed => "robots_disallowed",
            Self::FetchTimeout => "fetch_timeout",
            Self::FetchFailed => "fetch_failed",
            Self::QualityRejected => "quality_rejected",
            Self::CrawlLocked => "crawl_locked",
            Self::IoError => "io_error",
        }
    }

    /// Suggested operator remedy for fatal conditions
    pub fn remedy(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "Create the configuration file or pass the correct path",
            Self::ConfigInvalid => "Fix the reported field in the configuration file",
            Self::IndexNotFound => "Run `docsift crawl <config>` to build the index first",
            Self::IndexCorrupted => "Delete the index file and recrawl",
            Self::StateCorrupted => "Delete the crawl-state file or rerun with --fresh",
            Self::SchemaMismatch => "Rebuild the artifact with this version of docsift",
            Self::MissingQuery => "Provide a non-empty query string",
            Self::QueryTooLong => "Shorten the query to at most 1000 characters",
            Self::LimitExceeded => "Request a limit between 1 and the configured max-limit",
            Self::InvalidDomain => "Pass a bare hostname such as docs.python.org",
            Self::BlockedHost => "Only public hosts can be crawled",
            Self::RobotsDisallowed => "The site disallows this path for our user agent",
            Self::FetchTimeout => "Increase crawler.timeout or retry later",
            Self::FetchFailed => "Check network connectivity and the URL",
            Self::QualityRejected => "The page did not contain enough article content",
            Self::CrawlLocked => "Wait for the other crawl to finish or pass --break-lock",
            Self::IoError => "Check file permissions and disk space",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for Docsift operations
pub type Result<T> = std::result::Result<T, DocsiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extractor::{ContentType, Extractor};
pub use index::{Document, SearchIndex, SearchOptions};
pub use query::{run_query, QueryRequest, QueryResult};
pub use self::url::{extract_host, is_blocked_host, is_whitelisted, normalize, normalize_url};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCode::IndexNotFound).unwrap();
        assert_eq!(json, "\"index_not_found\"");
        assert_eq!(ErrorCode::BlockedHost.as_str(), "blocked_host");
    }

    #[test]
    fn test_config_missing_maps_to_code() {
        let err = DocsiftError::from(ConfigError::Missing("x.toml".to_string()));
        assert_eq!(err.code(), ErrorCode::ConfigMissing);

        let err = DocsiftError::from(ConfigError::Validation("bad".to_string()));
        assert_eq!(err.code(), ErrorCode::ConfigInvalid);
    }
}
