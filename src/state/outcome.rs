/// Per-URL outcome definitions for the crawl state machine
///
/// A queue entry moves `queued -> fetching` and then lands in exactly one
/// terminal outcome. Terminal outcomes are recorded in the ledger and are
/// never retried within the same run.
use crate::ErrorCode;
use std::fmt;

/// Where a queue entry is in the crawl, or how it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlOutcome {
    // ===== Active States =====
    /// Waiting in the queue
    Queued,

    /// Being fetched by a worker
    Fetching,

    // ===== Terminal Success States =====
    /// Extracted, passed the quality gate and stored in the index
    Indexed,

    // ===== Terminal Skip States =====
    /// Extracted but rejected by the quality gate
    QualityRejected,

    /// robots.txt disallows the path for our agent
    DisallowedByRobots,

    /// Host or one of its resolved addresses is private/internal
    BlockedHost,

    /// Host is outside the domain whitelist
    OutOfWhitelist,

    // ===== Terminal Error States =====
    /// HTTP error status, network failure or redirect refusal
    FetchFailed,

    /// Request exceeded the configured timeout
    FetchTimeout,

    /// Response Content-Type is not a document we can extract
    ContentMismatch,
}

impl CrawlOutcome {
    /// Returns true if no further processing will happen for the entry
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Fetching)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Indexed)
    }

    /// Returns true for outcomes decided without a successful fetch
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::DisallowedByRobots | Self::BlockedHost | Self::OutOfWhitelist
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::FetchTimeout | Self::ContentMismatch
        )
    }

    /// Error code reported for non-success terminal outcomes
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Queued | Self::Fetching | Self::Indexed => None,
            Self::QualityRejected => Some(ErrorCode::QualityRejected),
            Self::DisallowedByRobots => Some(ErrorCode::RobotsDisallowed),
            Self::BlockedHost => Some(ErrorCode::BlockedHost),
            Self::OutOfWhitelist => Some(ErrorCode::InvalidDomain),
            Self::FetchFailed | Self::ContentMismatch => Some(ErrorCode::FetchFailed),
            Self::FetchTimeout => Some(ErrorCode::FetchTimeout),
        }
    }

    /// Converts the outcome to its ledger string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Indexed => "indexed",
            Self::QualityRejected => "quality_rejected",
            Self::DisallowedByRobots => "disallowed_by_robots",
            Self::BlockedHost => "blocked_host",
            Self::OutOfWhitelist => "out_of_whitelist",
            Self::FetchFailed => "fetch_failed",
            Self::FetchTimeout => "fetch_timeout",
            Self::ContentMismatch => "content_mismatch",
        }
    }

    /// Parses an outcome from the ledger; None for unknown strings
    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|o| o.to_db_string() == s)
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Fetching,
            Self::Indexed,
            Self::QualityRejected,
            Self::DisallowedByRobots,
            Self::BlockedHost,
            Self::OutOfWhitelist,
            Self::FetchFailed,
            Self::FetchTimeout,
            Self::ContentMismatch,
        ]
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
