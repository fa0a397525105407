//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching under the SSRF guard
//! - Per-host politeness (rate limiting with robots crawl-delay)
//! - The advisory lock that serializes crawl runs
//! - Overall crawl coordination and resumable state

mod coordinator;
mod fetcher;
mod lock;
mod rate_limiter;

pub use coordinator::{run_crawl, Coordinator, CrawlOptions, CrawlSummary};
pub use fetcher::{build_http_client, fetch_url, is_accepted_content_type, FetchResult, MAX_REDIRECTS};
pub use lock::CrawlLock;
pub use rate_limiter::RateLimiter;
