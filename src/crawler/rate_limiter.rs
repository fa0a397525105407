//! Per-host politeness gate
//!
//! Each host has its own slot guarded by an async mutex. A caller holds the
//! slot while it sleeps out the remaining delay, so requests to one host are
//! serialized while different hosts proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Request bookkeeping for a single host
#[derive(Debug, Default)]
pub struct HostSlot {
    /// Number of requests granted to this host in the current run
    pub request_count: u32,

    /// When the last request to this host was granted
    pub last_request_time: Option<Instant>,
}

impl HostSlot {
    /// Time left before the host may be contacted again
    ///
    /// Returns None if a request can be made now.
    pub fn time_until_next_request(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < min_delay).then(|| min_delay - elapsed)
    }

    /// Records that a request was granted
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }
}

/// Enforces `max(default delay, crawl-delay)` between requests to a host
pub struct RateLimiter {
    default_delay: Duration,
    slots: Mutex<HashMap<String, Arc<Mutex<HostSlot>>>>,
}

impl RateLimiter {
    /// Creates a limiter with the configured default delay
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Effective minimum spacing for a host
    pub fn effective_delay(&self, crawl_delay: Option<Duration>) -> Duration {
        match crawl_delay {
            Some(delay) => delay.max(self.default_delay),
            None => self.default_delay,
        }
    }

    /// Blocks until the host may be contacted, then claims the slot
    ///
    /// # Arguments
    ///
    /// * `host` - Host key (hostname plus explicit port)
    /// * `crawl_delay` - Crawl-delay declared by the host's robots.txt
    ///
    /// # Returns
    ///
    /// How long the caller waited
    pub async fn wait_for_slot(&self, host: &str, crawl_delay: Option<Duration>) -> Duration {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(host.to_string()).or_default())
        };

        let min_delay = self.effective_delay(crawl_delay);
        let started = Instant::now();

        let mut slot = slot.lock().await;
        if let Some(wait) = slot.time_until_next_request(min_delay, Instant::now()) {
            tracing::trace!("Waiting {:?} before contacting {}", wait, host);
            tokio::time::sleep(wait).await;
        }
        slot.record_request(Instant::now());

        started.elapsed()
    }

    /// Number of requests granted to a host so far
    pub async fn request_count(&self, host: &str) -> u32 {
        let slot = {
            let slots = self.slots.lock().await;
            match slots.get(host) {
                Some(slot) => Arc::clone(slot),
                None => return 0,
            }
        };
        let count = slot.lock().await.request_count;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ready_without_history() {
        let slot = HostSlot::default();
        assert!(slot
            .time_until_next_request(Duration::from_secs(1), Instant::now())
            .is_none());
    }

    #[test]
    fn test_effective_delay_takes_larger() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        assert_eq!(limiter.effective_delay(None), Duration::from_millis(500));
        assert_eq!(
            limiter.effective_delay(Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        assert_eq!(
            limiter.effective_delay(Some(Duration::from_millis(100))),
            Duration::from_millis(500)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_host_spaced_by_default_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));

        let first = Instant::now();
        limiter.wait_for_slot("docs.python.org", None).await;
        limiter.wait_for_slot("docs.python.org", None).await;
        let gap = first.elapsed();

        assert!(gap >= Duration::from_millis(1000), "gap was {:?}", gap);
        assert_eq!(limiter.request_count("docs.python.org").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crawl_delay_overrides_lower_default() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let crawl_delay = Some(Duration::from_secs(5));

        limiter.wait_for_slot("slow.example.org", crawl_delay).await;
        let second_started = Instant::now();
        let waited = limiter.wait_for_slot("slow.example.org", crawl_delay).await;

        assert!(waited >= Duration::from_millis(5000));
        assert!(second_started.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_hosts_not_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(10)));
        limiter.wait_for_slot("a.example.org", None).await;

        // a.example.org is now cooling down; b.example.org must not wait behind it
        let a = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.wait_for_slot("a.example.org", None).await })
        };
        let b = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.wait_for_slot("b.example.org", None).await })
        };

        let waited_b = b.await.unwrap();
        let waited_a = a.await.unwrap();
        assert_eq!(waited_b, Duration::ZERO);
        assert!(waited_a >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_same_host_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(2)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.wait_for_slot("docs.rs", None).await;
                Instant::now()
            }));
        }

        let mut granted = Vec::new();
        for handle in handles {
            granted.push(handle.await.unwrap());
        }
        granted.sort();

        assert!(granted[1] - granted[0] >= Duration::from_secs(2));
        assert!(granted[2] - granted[1] >= Duration::from_secs(2));
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
