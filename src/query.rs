//! Stateless query tool
//!
//! Each call loads the persisted index from disk, validates the request,
//! runs the search and returns structured results. Nothing is shared with a
//! running crawl; the query sees the last checkpointed index.

use crate::config::{validate_domain_string, Config};
use crate::extractor::strip_code;
use crate::index::{tokenize_query, IndexError, SearchIndex, SearchOptions};
use crate::{ConfigError, ErrorCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Longest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 1000;

/// Target snippet length, in characters
pub const SNIPPET_CHARS: usize = 200;

/// A search request as received from the command line or a calling agent
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    /// Falls back to `search.default-limit`
    pub limit: Option<usize>,
    /// Exact-or-subdomain host filter
    pub domain: Option<String>,
    pub min_score: f64,
    pub offset: usize,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// One ranked hit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub domain: String,
    pub score: f64,
    pub crawled_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query is empty")]
    MissingQuery,

    #[error("Query is {length} characters; the maximum is {max}")]
    QueryTooLong { length: usize, max: usize },

    #[error("Limit {limit} is outside 1..={max}")]
    LimitExceeded { limit: usize, max: usize },

    #[error("Invalid domain filter '{0}'")]
    InvalidDomain(String),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Index(#[from] IndexError),
}

impl QueryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingQuery => ErrorCode::MissingQuery,
            Self::QueryTooLong { .. } => ErrorCode::QueryTooLong,
            Self::LimitExceeded { .. } => ErrorCode::LimitExceeded,
            Self::InvalidDomain(_) => ErrorCode::InvalidDomain,
            Self::Config(e) => e.code(),
            Self::Index(e) => e.code(),
        }
    }
}

/// Structured error printed by the query command
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    pub remedy: &'static str,
}

impl From<&QueryError> for ToolError {
    fn from(e: &QueryError) -> Self {
        let code = e.code();
        Self {
            code,
            message: e.to_string(),
            remedy: code.remedy(),
        }
    }
}

/// Loads the configured index and answers one query
///
/// # Errors
///
/// Validation errors (`missing_query`, `query_too_long`, `limit_exceeded`,
/// `invalid_domain`) are reported before the index is touched. A missing or
/// unreadable index maps to `index_not_found`, `index_corrupted` or
/// `schema_mismatch`. No matches is an empty vector, not an error.
pub fn run_query(config: &Config, request: &QueryRequest) -> Result<Vec<QueryResult>, QueryError> {
    let options = validate_request(config, request)?;
    let index = SearchIndex::load(Path::new(&config.output.index_path))?;
    execute(&index, &request.query, &options)
}

/// Validates a request and converts it into search options
pub fn validate_request(config: &Config, request: &QueryRequest) -> Result<SearchOptions, QueryError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(QueryError::MissingQuery);
    }

    let length = query.chars().count();
    if length > MAX_QUERY_CHARS {
        return Err(QueryError::QueryTooLong {
            length,
            max: MAX_QUERY_CHARS,
        });
    }

    let max = config.search.max_limit;
    let limit = request.limit.unwrap_or(config.search.default_limit);
    if limit == 0 || limit > max {
        return Err(QueryError::LimitExceeded { limit, max });
    }

    let domain_filter = match request.domain.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            validate_domain_string(&domain)
                .map_err(|_| QueryError::InvalidDomain(domain.clone()))?;
            Some(domain)
        }
    };

    let min_score = if request.min_score.is_finite() {
        request.min_score.max(0.0)
    } else {
        0.0
    };

    Ok(SearchOptions {
        limit,
        domain_filter,
        min_score,
        offset: request.offset,
    })
}

/// Runs a validated search against an already loaded index
pub fn execute(
    index: &SearchIndex,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<QueryResult>, QueryError> {
    let hits = index.search(query, options)?;
    let terms = tokenize_query(query);

    Ok(hits
        .into_iter()
        .map(|hit| {
            let doc = hit.document;
            QueryResult {
                title: doc.title.clone(),
                url: doc.url.clone(),
                snippet: make_snippet(&doc.content, &terms, &doc.excerpt, SNIPPET_CHARS),
                domain: doc.domain.clone(),
                score: hit.score,
                crawled_at: doc.crawled_at,
            }
        })
        .collect())
}

/// Window of about `width` characters around the first query-term hit
///
/// Code is stripped first. Falls back to the excerpt when no term occurs in
/// the prose (e.g. the match was in the title or inside a code block).
pub fn make_snippet(content: &str, terms: &[String], excerpt: &str, width: usize) -> String {
    let prose = strip_code(content);
    let chars: Vec<char> = prose.chars().collect();

    let Some(hit) = first_hit(&chars, terms) else {
        return excerpt.to_string();
    };

    if chars.len() <= width {
        return prose;
    }

    let mut start = hit.saturating_sub(width / 3);
    let mut end = (start + width).min(chars.len());
    if end == chars.len() {
        start = end.saturating_sub(width);
    }

    // Snap to word boundaries
    if start > 0 {
        while start < hit && !chars[start - 1].is_whitespace() {
            start += 1;
        }
    }
    if end < chars.len() {
        while end > hit + 1 && !chars[end].is_whitespace() {
            end -= 1;
        }
    }

    let body: String = chars[start..end].iter().collect();
    let mut snippet = String::new();
    if start > 0 {
        snippet.push('…');
    }
    snippet.push_str(body.trim());
    if end < chars.len() {
        snippet.push('…');
    }
    snippet
}

/// Char offset of the first word equal to or starting with a query term
fn first_hit(chars: &[char], terms: &[String]) -> Option<usize> {
    if terms.is_empty() {
        return None;
    }

    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut i = 0;
    while i < chars.len() {
        if !is_word(chars[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && is_word(chars[i]) {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect::<String>().to_lowercase();
        if terms.iter().any(|term| word.starts_with(term.as_str())) {
            return Some(start);
        }
    }
    None
}
