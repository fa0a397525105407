//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt per host. Policies feed
//! both the allow/deny check before every fetch and the per-host rate limiter.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::{RobotsPolicy, ROBOTS_TTL_HOURS};

/// Extracts the product token from a full user-agent header value
///
/// `Docsift/0.1 (+https://example.com; ops@example.com)` becomes `Docsift`.
pub fn agent_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or(user_agent)
}
