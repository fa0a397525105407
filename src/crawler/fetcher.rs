//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler:
//! - Building the HTTP client with the crawler's user agent and timeout
//! - Following redirects under the SSRF guard and whitelist (max 5 hops)
//! - Resolving every connection through the guard
//! - Content-Type and size screening
//! - Error classification into crawl outcomes

use crate::config::UserAgentConfig;
use crate::extractor::MAX_HTML_SIZE;
use crate::state::CrawlOutcome;
use crate::url::{is_whitelisted, BlockedAddress, HostGuard};
use reqwest::{redirect::Policy, Client, Response};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 5;

/// Content-Type prefixes the extractor can handle
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "text/plain",
    "text/markdown",
    "text/x-markdown",
];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: Url,
        status_code: u16,
        content_type: String,
        body: String,
    },

    /// Response is not a document type we extract
    ContentMismatch { content_type: String },

    /// Non-success HTTP status
    HttpError { status_code: u16 },

    /// Request exceeded the client timeout
    Timeout,

    /// A redirect, or a DNS answer, pointed at a private or internal host
    BlockedRedirect { target: String },

    /// A redirect left the domain whitelist
    OffsiteRedirect { target: String },

    /// Connection, TLS, redirect-limit or body errors
    NetworkError { error: String },
}

impl FetchResult {
    /// Crawl outcome for a failed fetch; None on success
    pub fn failure_outcome(&self) -> Option<CrawlOutcome> {
        match self {
            Self::Success { .. } => None,
            Self::ContentMismatch { .. } => Some(CrawlOutcome::ContentMismatch),
            Self::HttpError { .. } | Self::NetworkError { .. } => Some(CrawlOutcome::FetchFailed),
            Self::Timeout => Some(CrawlOutcome::FetchTimeout),
            Self::BlockedRedirect { .. } => Some(CrawlOutcome::BlockedHost),
            Self::OffsiteRedirect { .. } => Some(CrawlOutcome::OutOfWhitelist),
        }
    }

    /// Short human-readable description for the ledger
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::ContentMismatch { content_type } => {
                Some(format!("unsupported content type '{}'", content_type))
            }
            Self::HttpError { status_code } => Some(format!("HTTP {}", status_code)),
            Self::Timeout => Some("request timed out".to_string()),
            Self::BlockedRedirect { target } => Some(format!("blocked host {}", target)),
            Self::OffsiteRedirect { target } => Some(format!("redirect off-whitelist to {}", target)),
            Self::NetworkError { error } => Some(error.clone()),
        }
    }
}

/// Raised from the redirect policy when a hop targets a blocked host
#[derive(Debug, Error)]
#[error("redirect to blocked host {0}")]
struct BlockedRedirect(String);

/// Raised from the redirect policy when a hop leaves the whitelist
#[derive(Debug, Error)]
#[error("redirect to {0} outside the whitelist")]
struct OffsiteRedirect(String);

/// Builds an HTTP client with proper configuration
///
/// Every redirect hop is checked against `guard` and the `domains`
/// whitelist; a failing hop aborts the request rather than following it.
/// The guard is also the client's DNS resolver, so hostnames that resolve
/// to private addresses are refused at connect time.
///
/// # Example
///
/// ```no_run
/// use docsift::config::UserAgentConfig;
/// use docsift::crawler::build_http_client;
/// use docsift::url::HostGuard;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Docsift".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let domains = vec!["docs.python.org".to_string()];
/// let client =
///     build_http_client(&config, Duration::from_secs(10), HostGuard::default(), domains).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
    guard: HostGuard,
    domains: Vec<String>,
) -> Result<Client, reqwest::Error> {
    let resolver = Arc::new(guard.clone());

    let policy = Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
        }
        let host = attempt.url().host_str().unwrap_or("").to_string();
        if guard.is_blocked(&host) {
            attempt.error(BlockedRedirect(host))
        } else if !is_whitelisted(&host, &domains) {
            attempt.error(OffsiteRedirect(host))
        } else {
            attempt.follow()
        }
    });

    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .dns_resolver(resolver)
        .redirect(policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with an accepted Content-Type | Success |
/// | Other Content-Type, or body over 10 MB | ContentMismatch |
/// | Non-2xx status | HttpError |
/// | Client timeout | Timeout |
/// | Redirect or DNS answer to a blocked host | BlockedRedirect |
/// | Redirect outside the whitelist | OffsiteRedirect |
/// | Connection/TLS/redirect-limit failure | NetworkError |
///
/// Failures are never retried within a run.
pub async fn fetch_url(client: &Client, url: &Url) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_accepted_content_type(&content_type) {
        return FetchResult::ContentMismatch { content_type };
    }

    if response
        .content_length()
        .is_some_and(|len| len > MAX_HTML_SIZE as u64)
    {
        return FetchResult::ContentMismatch {
            content_type: format!("{} (over {} bytes)", content_type, MAX_HTML_SIZE),
        };
    }

    match read_capped(response, MAX_HTML_SIZE).await {
        Ok(Some(body)) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Ok(None) => FetchResult::ContentMismatch {
            content_type: format!("{} (over {} bytes)", content_type, MAX_HTML_SIZE),
        },
        Err(e) => classify_error(&e),
    }
}

/// Reads the body chunk by chunk, giving up once it passes `limit` bytes
///
/// Returns `Ok(None)` for an oversized body. Invalid UTF-8 is replaced
/// rather than rejected.
async fn read_capped(mut response: Response, limit: usize) -> reqwest::Result<Option<String>> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Whether a Content-Type header names a document we extract
///
/// A missing header is accepted; the extractor sniffs the body.
pub fn is_accepted_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || ACCEPTED_CONTENT_TYPES.contains(&mime.as_str())
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    if let Some(blocked) = find_source::<BlockedRedirect>(e) {
        return FetchResult::BlockedRedirect {
            target: blocked.0.clone(),
        };
    }
    if let Some(blocked) = find_source::<BlockedAddress>(e) {
        return FetchResult::BlockedRedirect {
            target: blocked.to_string(),
        };
    }
    if let Some(offsite) = find_source::<OffsiteRedirect>(e) {
        return FetchResult::OffsiteRedirect {
            target: offsite.0.clone(),
        };
    }

    if e.is_timeout() {
        FetchResult::Timeout
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("connection failed: {}", e),
        }
    } else if e.is_redirect() {
        FetchResult::NetworkError {
            error: format!("redirect error: {}", e),
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
        }
    }
}

fn find_source<'a, T: StdError + 'static>(e: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut current = Some(e);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<T>() {
            return Some(found);
        }
        current = err.source();
    }
    None
}
