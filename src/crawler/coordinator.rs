//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns the index, the crawl state and the ledger. Fetch
//! tasks run concurrently (bounded by `concurrent-requests`) and hand their
//! results back; only the coordinator mutates shared structures, so the
//! index never needs a lock.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::lock::CrawlLock;
use crate::crawler::rate_limiter::RateLimiter;
use crate::extractor::{Extractor, QualityVerdict};
use crate::index::{Document, SearchIndex};
use crate::robots::{agent_token, RobotsCache};
use crate::state::{CrawlOutcome, CrawlState, QueueEntry};
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::url::{extract_host, host_key, normalize_url, screen_link, HostGuard, LinkVerdict};
use crate::Result;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;

/// How often the loop wakes to check for shutdown while fetches are in flight
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Run-level switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Ignore any persisted crawl state
    pub fresh: bool,
    /// Remove a leftover lockfile instead of failing
    pub break_lock: bool,
}

/// What a finished (or interrupted) run did
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub run_id: i64,
    pub status: RunStatus,
    pub pages_processed: u64,
    pub documents_indexed: u64,
    pub outcomes: HashMap<CrawlOutcome, u64>,
    pub queue_remaining: usize,
    pub index_size: usize,
    pub removed_by_whitelist: usize,
    pub elapsed: Duration,
}

/// Everything a fetch task needs, shared read-only across tasks
struct FetchContext {
    client: Client,
    robots: RobotsCache,
    limiter: RateLimiter,
    guard: HostGuard,
    extractor: Extractor,
    domains: Vec<String>,
    respect_robots: bool,
}

/// What a fetch task hands back to the coordinator
#[derive(Debug)]
struct TaskReport {
    entry: QueueEntry,
    domain: String,
    outcome: CrawlOutcome,
    detail: Option<String>,
    document: Option<Document>,
    /// Canonical final URL when a redirect changed it
    redirected_to: Option<String>,
    links: Vec<String>,
}

enum Precheck {
    Fetch,
    /// Discard silently
    Drop,
    /// Terminal outcome decided without a fetch
    Finished(TaskReport),
}

impl TaskReport {
    fn new(entry: QueueEntry, domain: String, outcome: CrawlOutcome) -> Self {
        Self {
            entry,
            domain,
            outcome,
            detail: None,
            document: None,
            redirected_to: None,
            links: Vec::new(),
        }
    }

    fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    index: SearchIndex,
    state: CrawlState,
    storage: SqliteStorage,
    ctx: Arc<FetchContext>,
    run_id: i64,
    index_path: PathBuf,
    state_path: PathBuf,
    shutdown: Arc<AtomicBool>,
    /// Entries handed to fetch tasks, keyed by URL
    in_flight: HashMap<String, QueueEntry>,
    removed_by_whitelist: usize,
    outcomes: HashMap<CrawlOutcome, u64>,
    pages_processed: u64,
    documents_indexed: u64,
    _lock: CrawlLock,
}

impl Coordinator {
    /// Prepares a crawl run
    ///
    /// Takes the crawl lock, loads the index and drops documents whose
    /// domain left the whitelist, then either resumes the persisted queue or
    /// starts a new pass from the seeds.
    ///
    /// # Errors
    ///
    /// Fails when another crawl holds the lock, when the index or crawl-state
    /// file is corrupted or from another schema, or when the ledger cannot be
    /// opened.
    pub fn new(config: Config, config_hash: &str, options: CrawlOptions) -> Result<Self> {
        let index_path = PathBuf::from(&config.output.index_path);
        let state_path = PathBuf::from(&config.output.state_path);

        let lock = CrawlLock::acquire(&index_path, options.break_lock)?;

        let mut index = SearchIndex::load_or_default(&index_path)?;
        let removed = index.retain_domains(&config.domains);
        if !removed.is_empty() {
            tracing::info!(
                "Removed {} documents outside the current whitelist",
                removed.len()
            );
            for url in &removed {
                tracing::debug!("Removed {}", url);
            }
        }

        let mut state = if options.fresh {
            tracing::info!("Ignoring persisted crawl state (--fresh)");
            CrawlState::new()
        } else {
            CrawlState::load(&state_path)?.unwrap_or_default()
        };

        let max_documents = u64::from(config.crawler.max_documents);
        if state.is_pass_complete() || state.document_count >= max_documents {
            if state.seen_len() > 0 {
                tracing::info!("Previous pass finished, starting a new crawl pass");
            }
            state.start_new_pass();
            for seed in &config.seeds {
                match normalize_url(seed) {
                    Ok(url) => {
                        state.enqueue(url.to_string(), 0);
                    }
                    Err(e) => tracing::warn!("Skipping seed {}: {}", seed, e),
                }
            }
            tracing::info!("Seeded queue with {} URLs", state.queue_len());
        } else {
            tracing::info!(
                "Resuming crawl: {} URLs queued, {} seen, {} documents this pass",
                state.queue_len(),
                state.seen_len(),
                state.document_count
            );
        }

        let mut storage = SqliteStorage::new(std::path::Path::new(&config.output.database_path))?;
        let run_id = storage.create_run(config_hash)?;

        let timeout = Duration::from_millis(config.crawler.timeout);
        let guard = HostGuard::new(&config.security.allow_hosts);
        let client = build_http_client(
            &config.user_agent,
            timeout,
            guard.clone(),
            config.domains.clone(),
        )?;
        let agent = agent_token(&config.user_agent.crawler_name).to_string();

        let ctx = FetchContext {
            robots: RobotsCache::new(client.clone(), agent, timeout),
            client,
            limiter: RateLimiter::new(Duration::from_millis(config.crawler.delay)),
            guard,
            extractor: Extractor::from_config(&config.extraction),
            domains: config.domains.clone(),
            respect_robots: config.crawler.respect_robots,
        };

        Ok(Self {
            config: Arc::new(config),
            index,
            state,
            storage,
            ctx: Arc::new(ctx),
            run_id,
            index_path,
            state_path,
            shutdown: Arc::new(AtomicBool::new(false)),
            in_flight: HashMap::new(),
            removed_by_whitelist: removed.len(),
            outcomes: HashMap::new(),
            pages_processed: 0,
            documents_indexed: 0,
            _lock: lock,
        })
    }

    /// Flag that stops the run at the next loop iteration when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Runs the crawl loop to completion, budget exhaustion or shutdown
    ///
    /// State and index are flushed before returning in every case, with any
    /// interrupted fetches back at the head of the queue. Per-URL failures
    /// are recorded and never abort the run.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let started = Instant::now();
        tracing::info!("Starting crawl run {}", self.run_id);

        let result = self.crawl_loop(started).await;
        self.requeue_in_flight();

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                tracing::error!("Crawl run {} failed: {}", self.run_id, e);
                if let Err(save_err) = self.checkpoint() {
                    tracing::error!("Failed to flush state after error: {}", save_err);
                }
                self.storage
                    .finish_run(self.run_id, RunStatus::Failed, self.documents_indexed)?;
                return Err(e);
            }
        };

        self.checkpoint()?;
        self.storage
            .finish_run(self.run_id, status, self.documents_indexed)?;

        let summary = CrawlSummary {
            run_id: self.run_id,
            status,
            pages_processed: self.pages_processed,
            documents_indexed: self.documents_indexed,
            outcomes: self.outcomes.clone(),
            queue_remaining: self.state.queue_len(),
            index_size: self.index.len(),
            removed_by_whitelist: self.removed_by_whitelist,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Crawl {}: {} pages processed, {} documents indexed, {} queued, in {:?}",
            status.to_db_string(),
            summary.pages_processed,
            summary.documents_indexed,
            summary.queue_remaining,
            summary.elapsed
        );

        Ok(summary)
    }

    async fn crawl_loop(&mut self, started: Instant) -> Result<RunStatus> {
        let max_in_flight = self.config.crawler.concurrent_requests.max(1) as usize;
        let max_documents = u64::from(self.config.crawler.max_documents);
        let deadline = self
            .config
            .crawler
            .time_budget
            .map(|secs| started + Duration::from_secs(secs));

        // Dropping the set on any return aborts the remaining tasks
        let mut tasks: JoinSet<TaskReport> = JoinSet::new();

        loop {
            if self.should_stop(deadline) {
                tasks.abort_all();
                return Ok(RunStatus::Interrupted);
            }

            while tasks.len() < max_in_flight
                && self.state.document_count + (tasks.len() as u64) < max_documents
            {
                let Some(entry) = self.state.pop_next() else {
                    break;
                };

                match self.precheck(&entry) {
                    Precheck::Fetch => {}
                    Precheck::Drop => continue,
                    Precheck::Finished(report) => {
                        self.handle_report(report)?;
                        continue;
                    }
                }

                tracing::debug!("Fetching {} (depth {})", entry.url, entry.depth);
                self.in_flight.insert(entry.url.clone(), entry.clone());
                tasks.spawn(process_entry(Arc::clone(&self.ctx), entry));
            }

            if tasks.is_empty() {
                if self.state.document_count >= max_documents {
                    tracing::info!("Reached max-documents ({})", max_documents);
                } else {
                    tracing::info!("Queue is empty, crawl pass complete");
                }
                return Ok(RunStatus::Completed);
            }

            tokio::select! {
                joined = tasks.join_next() => {
                    match joined {
                        Some(Ok(report)) => {
                            self.in_flight.remove(&report.entry.url);
                            self.handle_report(report)?;
                        }
                        Some(Err(e)) => tracing::error!("Fetch task failed: {}", e),
                        None => {}
                    }
                }
                _ = tokio::time::sleep(SHUTDOWN_POLL) => {}
            }
        }
    }

    /// Returns fetches that never reported back to the head of the queue
    fn requeue_in_flight(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        let interrupted = self.in_flight.len();
        for (_, entry) in self.in_flight.drain() {
            self.state.requeue(entry);
        }
        tracing::info!("{} in-flight URLs returned to the queue", interrupted);
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        if self.shutdown.load(Ordering::SeqCst) {
            tracing::info!("Shutdown requested");
            return true;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::info!("Time budget exhausted");
            return true;
        }
        false
    }

    /// Checks done before any network call
    fn precheck(&self, entry: &QueueEntry) -> Precheck {
        if entry.depth > self.config.crawler.max_depth {
            // max-depth shrank since the entry was queued
            tracing::debug!("Dropping {}: depth {} over limit", entry.url, entry.depth);
            return Precheck::Drop;
        }

        let (verdict, url) = screen_link(&entry.url, &self.config.domains, &self.ctx.guard);
        let domain = url.as_ref().and_then(extract_host).unwrap_or_default();

        let outcome = match verdict {
            LinkVerdict::Accept => return Precheck::Fetch,
            LinkVerdict::Malformed => CrawlOutcome::FetchFailed,
            LinkVerdict::OutOfWhitelist => CrawlOutcome::OutOfWhitelist,
            LinkVerdict::BlockedHost => CrawlOutcome::BlockedHost,
        };
        tracing::debug!("Skipping {}: {}", entry.url, outcome);
        Precheck::Finished(TaskReport::new(entry.clone(), domain, outcome))
    }

    fn handle_report(&mut self, report: TaskReport) -> Result<()> {
        let TaskReport {
            entry,
            domain,
            outcome,
            detail,
            document,
            redirected_to,
            links,
        } = report;

        self.storage.record_outcome(
            self.run_id,
            &entry.url,
            &domain,
            entry.depth,
            outcome,
            detail.as_deref(),
        )?;
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        self.pages_processed += 1;

        match outcome {
            CrawlOutcome::Indexed => tracing::debug!("Indexed {}", entry.url),
            o if o.is_error() => tracing::warn!(
                "{} for {}: {}",
                o,
                entry.url,
                detail.as_deref().unwrap_or("no detail")
            ),
            o => tracing::debug!(
                "{} for {}{}",
                o,
                entry.url,
                detail.map(|d| format!(": {}", d)).unwrap_or_default()
            ),
        }

        if let Some(final_url) = redirected_to {
            self.state.mark_seen(&final_url);
        }

        if let Some(document) = document {
            if self.index.add_document(document) {
                tracing::debug!("Replaced existing document for {}", entry.url);
            }
            self.state.record_indexed();
            self.documents_indexed += 1;
        }

        if entry.depth < self.config.crawler.max_depth {
            self.enqueue_links(&links, entry.depth + 1);
        }

        let interval = u64::from(self.config.crawler.checkpoint_interval.max(1));
        if self.pages_processed % interval == 0 {
            self.checkpoint()?;
            tracing::info!(
                "Progress: {} pages processed, {} documents indexed, {} queued",
                self.pages_processed,
                self.documents_indexed,
                self.state.queue_len()
            );
        }

        Ok(())
    }

    fn enqueue_links(&mut self, links: &[String], depth: u32) {
        let mut added = 0;
        for link in links {
            let (verdict, url) = screen_link(link, &self.config.domains, &self.ctx.guard);
            match (verdict, url) {
                (LinkVerdict::Accept, Some(url)) => {
                    if self.state.enqueue(url.to_string(), depth) {
                        added += 1;
                    }
                }
                (verdict, _) => tracing::trace!("Discarding link {}: {:?}", link, verdict),
            }
        }
        if added > 0 {
            tracing::debug!("Enqueued {} new links at depth {}", added, depth);
        }
    }

    /// Flushes the index, then the crawl state
    ///
    /// The index goes first: a crash between the two writes leaves state
    /// that re-fetches a few pages rather than state that skips unsaved ones.
    /// Fetches still running are saved as queued for the same reason.
    fn checkpoint(&mut self) -> Result<()> {
        self.index.save(&self.index_path)?;
        self.state.touch();
        self.state
            .save_with_pending(&self.state_path, self.in_flight.values())?;
        tracing::debug!(
            "Checkpoint: {} documents, {} queued",
            self.index.len(),
            self.state.queue_len()
        );
        Ok(())
    }
}

/// Fetches and extracts one queue entry
///
/// Order: robots check, DNS guard, rate-limit slot, fetch, extraction.
async fn process_entry(ctx: Arc<FetchContext>, entry: QueueEntry) -> TaskReport {
    let url = match Url::parse(&entry.url) {
        Ok(url) => url,
        Err(e) => {
            return TaskReport::new(entry, String::new(), CrawlOutcome::FetchFailed)
                .with_detail(Some(e.to_string()))
        }
    };
    let domain = extract_host(&url).unwrap_or_default();

    let crawl_delay = if ctx.respect_robots {
        let policy = ctx.robots.get_policy(&url).await;
        if !policy.is_allowed(url.as_str()) {
            return TaskReport::new(entry, domain, CrawlOutcome::DisallowedByRobots);
        }
        policy.crawl_delay()
    } else {
        None
    };

    let port = url.port_or_known_default().unwrap_or(80);
    match ctx.guard.resolves_to_blocked(&domain, port).await {
        Ok(false) => {}
        Ok(true) => {
            return TaskReport::new(entry, domain, CrawlOutcome::BlockedHost)
                .with_detail(Some("resolves to a private address".to_string()))
        }
        Err(e) => {
            return TaskReport::new(entry, domain, CrawlOutcome::FetchFailed)
                .with_detail(Some(format!("DNS lookup failed: {}", e)))
        }
    }

    let slot_key = host_key(&url).unwrap_or_else(|| domain.clone());
    let waited = ctx.limiter.wait_for_slot(&slot_key, crawl_delay).await;
    if !waited.is_zero() {
        tracing::trace!("Waited {:?} for {}", waited, slot_key);
    }

    let (final_url, body, mime) = match fetch_url(&ctx.client, &url).await {
        FetchResult::Success {
            final_url,
            body,
            content_type,
            ..
        } => (final_url, body, content_type),
        failure => {
            let outcome = failure
                .failure_outcome()
                .unwrap_or(CrawlOutcome::FetchFailed);
            return TaskReport::new(entry, domain, outcome).with_detail(failure.detail());
        }
    };

    // Redirects may land elsewhere; the landing page must still be eligible
    let (verdict, canonical) = screen_link(final_url.as_str(), &ctx.domains, &ctx.guard);
    let canonical = match (verdict, canonical) {
        (LinkVerdict::Accept, Some(canonical)) => canonical,
        (LinkVerdict::BlockedHost, _) => {
            return TaskReport::new(entry, domain, CrawlOutcome::BlockedHost)
                .with_detail(Some(format!("redirected to {}", final_url)))
        }
        _ => {
            return TaskReport::new(entry, domain, CrawlOutcome::OutOfWhitelist)
                .with_detail(Some(format!("redirected to {}", final_url)))
        }
    };

    let extracted = ctx.extractor.extract_with_mime(&body, &final_url, &mime);
    let links = extracted.links.clone();
    let verdict = extracted.verdict.clone();
    let document = Document::from_extracted(&canonical, extracted, entry.depth, Utc::now());

    let redirected_to = (canonical.as_str() != entry.url).then(|| canonical.to_string());

    let mut report = match (&verdict, document) {
        (QualityVerdict::Pass, Some(document)) => {
            let mut report = TaskReport::new(entry, domain, CrawlOutcome::Indexed);
            report.document = Some(document);
            report
        }
        (QualityVerdict::Fail(reason), _) => {
            TaskReport::new(entry, domain, CrawlOutcome::QualityRejected)
                .with_detail(Some(reason.to_string()))
        }
        (QualityVerdict::Pass, None) => TaskReport::new(entry, domain, CrawlOutcome::FetchFailed)
            .with_detail(Some("page has no usable host".to_string())),
    };
    report.redirected_to = redirected_to;
    report.links = links;
    report
}

/// Runs a complete crawl, stopping cleanly on Ctrl-C or SIGTERM
///
/// # Example
///
/// ```no_run
/// use docsift::config::load_config_with_hash;
/// use docsift::crawler::{run_crawl, CrawlOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("docsift.toml"))?;
/// let summary = run_crawl(config, &hash, CrawlOptions::default()).await?;
/// println!("{} documents indexed", summary.documents_indexed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    options: CrawlOptions,
) -> Result<CrawlSummary> {
    let mut coordinator = Coordinator::new(config, config_hash, options)?;

    let shutdown = coordinator.shutdown_handle();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, flushing state");
        shutdown.store(true, Ordering::SeqCst);
    });

    let result = coordinator.run().await;
    signal_task.abort();
    result
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Resolves on Ctrl-C, or on SIGTERM from a process supervisor
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = interrupt() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            interrupt().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    interrupt().await;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[tokio::test]
    async fn test_sigterm_resolves_shutdown_signal() {
        let mut signal = Box::pin(shutdown_signal());

        // First poll installs the handler
        let pending = tokio::time::timeout(Duration::from_millis(50), &mut signal).await;
        assert!(pending.is_err());

        let status = Command::new("kill")
            .arg("-TERM")
            .arg(std::process::id().to_string())
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), signal)
            .await
            .expect("SIGTERM should resolve the shutdown signal");
    }
}
