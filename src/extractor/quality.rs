//! Quality gate applied before a page may be indexed

use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Only the title and the opening of the body are checked for error markers
const ERROR_WINDOW_CHARS: usize = 300;

/// Stub markers only count on pages shorter than this
const STUB_MAX_CHARS: usize = 1500;

/// Content length at which the quality score saturates
const FULL_SCORE_CHARS: usize = 5000;

static ERROR_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bpage not found\b",
        r"(?i)^\s*404\b",
        r"(?i)\b(error|http) 404\b",
        r"(?i)\b404 not found\b",
        r"(?i)\b500 internal server error\b",
        r"(?i)\b(403 )?forbidden\b.*\baccess\b|\baccess denied\b",
        r"(?i)\bthis page (does not|doesn't) exist\b",
        r"(?i)\bthe requested url was not found\b",
        r"(?i)\bservice (temporarily )?unavailable\b",
        r"(?i)\b(site|page) is (currently )?under maintenance\b",
        r"(?i)\b(please )?enable javascript to (view|use|continue)\b",
        r"(?i)\bchecking your browser before accessing\b",
    ])
    .expect("BUG: hardcoded error-page patterns are invalid")
});

static STUB_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bthis (article|page|section) is a stub\b",
        r"(?i)\bdoes not have an article with this exact name\b",
        r"(?i)\bcoming soon\b",
        r"(?i)\bunder construction\b",
        r"(?i)\bno content (is )?(available|yet)\b",
        r"(?i)\bthis page (is|has been) (intentionally )?left blank\b",
        r"(?i)\blorem ipsum\b",
        r"(?i)\b(documentation|content) (is )?(to be|will be) (written|added)\b",
    ])
    .expect("BUG: hardcoded stub-page patterns are invalid")
});

/// Why a page was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum RejectReason {
    /// Content shorter than the configured minimum
    TooShort { length: usize, minimum: usize },
    /// Title or opening matched an error-page marker
    ErrorPage,
    /// Short page matched a placeholder marker
    StubPage,
    /// Input could not be parsed into any content
    ParseFailed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { length, minimum } => {
                write!(f, "too-short ({} < {} chars)", length, minimum)
            }
            Self::ErrorPage => f.write_str("error-page pattern"),
            Self::StubPage => f.write_str("stub pattern"),
            Self::ParseFailed => f.write_str("parse failed"),
        }
    }
}

/// Pass/fail judgment on extracted content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum QualityVerdict {
    Pass,
    Fail(RejectReason),
}

impl QualityVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Judges extracted content
///
/// # Arguments
///
/// * `title` - Derived page title
/// * `content` - Normalized body text
/// * `min_length` - Minimum content length in characters
pub fn assess(title: &str, content: &str, min_length: usize) -> QualityVerdict {
    let length = content.chars().count();

    if length < min_length {
        return QualityVerdict::Fail(RejectReason::TooShort {
            length,
            minimum: min_length,
        });
    }

    let opening: String = content.chars().take(ERROR_WINDOW_CHARS).collect();
    if ERROR_PATTERNS.is_match(title)
        || ERROR_PATTERNS.is_match(&opening)
    {
        return QualityVerdict::Fail(RejectReason::ErrorPage);
    }

    if length < STUB_MAX_CHARS && (STUB_PATTERNS.is_match(title) || STUB_PATTERNS.is_match(content)) {
        return QualityVerdict::Fail(RejectReason::StubPage);
    }

    QualityVerdict::Pass
}

/// Score in `[0, 1]` growing with content length, zero for failed pages
pub fn quality_score(verdict: &QualityVerdict, content: &str) -> f64 {
    if !verdict.is_pass() {
        return 0.0;
    }
    let length = content.chars().count().min(FULL_SCORE_CHARS);
    length as f64 / FULL_SCORE_CHARS as f64
}
