//! Per-host robots.txt cache
//!
//! Policies are keyed by host (plus explicit port) and refreshed once they
//! outlive their 24 hour TTL. Fetch failures fail open.

use crate::robots::RobotsPolicy;
use crate::url::{host_key, origin_of};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Robots.txt bodies larger than this are treated as unavailable
const MAX_ROBOTS_BYTES: usize = 512 * 1024;

/// Cache of robots.txt policies owned by one crawl run
pub struct RobotsCache {
    client: Client,
    agent: String,
    timeout: Duration,
    policies: Mutex<HashMap<String, RobotsPolicy>>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client (carries the user agent and redirect policy)
    /// * `agent` - Product token matched against `User-agent` lines
    /// * `timeout` - Hard timeout for each robots.txt fetch
    pub fn new(client: Client, agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            agent: agent.into(),
            timeout,
            policies: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the policy for the URL's host, fetching it if absent or stale
    ///
    /// The lock is released while fetching; two tasks racing on the same
    /// uncached host may both fetch, and the later insert wins.
    pub async fn get_policy(&self, url: &Url) -> RobotsPolicy {
        let Some(key) = host_key(url) else {
            return RobotsPolicy::allow_all();
        };

        {
            let policies = self.policies.lock().await;
            if let Some(policy) = policies.get(&key) {
                if !policy.is_stale() {
                    return policy.clone();
                }
                tracing::debug!("robots.txt for {} is stale, refetching", key);
            }
        }

        let policy = self.fetch(url).await;
        self.policies.lock().await.insert(key, policy.clone());
        policy
    }

    /// Seeds the cache with a known policy
    pub async fn insert(&self, url: &Url, policy: RobotsPolicy) {
        if let Some(key) = host_key(url) {
            self.policies.lock().await.insert(key, policy);
        }
    }

    /// Number of hosts with a cached policy
    pub async fn len(&self) -> usize {
        self.policies.lock().await.len()
    }

    async fn fetch(&self, url: &Url) -> RobotsPolicy {
        let Some(origin) = origin_of(url) else {
            return RobotsPolicy::allow_all();
        };
        let robots_url = match origin.join("/robots.txt") {
            Ok(u) => u,
            Err(_) => return RobotsPolicy::allow_all(),
        };

        tracing::debug!("Fetching {}", robots_url);

        let response = match self
            .client
            .get(robots_url.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("robots.txt fetch failed for {}: {}; allowing all", robots_url, e);
                return RobotsPolicy::allow_all();
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "robots.txt at {} returned HTTP {}; allowing all",
                robots_url,
                status.as_u16()
            );
            return RobotsPolicy::allow_all();
        }

        match response.text().await {
            Ok(body) if body.len() <= MAX_ROBOTS_BYTES => RobotsPolicy::parse(&body, &self.agent),
            Ok(body) => {
                tracing::warn!(
                    "robots.txt at {} is {} bytes; allowing all",
                    robots_url,
                    body.len()
                );
                RobotsPolicy::allow_all()
            }
            Err(e) => {
                tracing::warn!("robots.txt body unreadable at {}: {}; allowing all", robots_url, e);
                RobotsPolicy::allow_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn cache() -> RobotsCache {
        RobotsCache::new(Client::new(), "Docsift", Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_fresh_policy_served_from_cache() {
        let cache = cache();
        let url = Url::parse("http://127.0.0.1:1/page").unwrap();
        let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /private", "Docsift");
        cache.insert(&url, policy).await;

        let served = cache.get_policy(&url).await;
        assert!(!served.is_allowed("http://127.0.0.1:1/private/x"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_open() {
        let cache = cache();
        // Port 1 on loopback refuses connections
        let url = Url::parse("http://127.0.0.1:1/page").unwrap();
        let policy = cache.get_policy(&url).await;
        assert!(policy.is_allowed("http://127.0.0.1:1/anything"));
        assert!(policy.crawl_delay().is_none());
    }

    #[tokio::test]
    async fn test_stale_policy_is_refetched() {
        let cache = cache();
        let url = Url::parse("http://127.0.0.1:1/page").unwrap();
        let mut policy = RobotsPolicy::parse("User-agent: *\nDisallow: /", "Docsift");
        policy.fetched_at = Utc::now() - ChronoDuration::hours(25);
        cache.insert(&url, policy).await;

        // The refetch fails and falls back to allow-all, replacing the stale deny
        let served = cache.get_policy(&url).await;
        assert!(served.is_allowed("http://127.0.0.1:1/page"));
    }
}
