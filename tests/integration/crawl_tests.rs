//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use crate::{create_test_config, html_page};
use docsift::crawler::{CrawlLock, CrawlOptions, Coordinator, CrawlSummary};
use docsift::index::{Document, SearchIndex};
use docsift::state::{CrawlOutcome, CrawlState};
use docsift::storage::{RunStatus, SqliteStorage, Storage};
use docsift::{Config, DocsiftError};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILLER: &str = "This guide walks through installation, configuration and the \
                      everyday commands you will use while working with the toolkit.";

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn crawl(config: Config) -> CrawlSummary {
    let mut coordinator = Coordinator::new(config, "test-hash", CrawlOptions::default())
        .expect("Failed to create coordinator");
    coordinator.run().await.expect("Crawl failed")
}

fn outcome_count(summary: &CrawlSummary, outcome: CrawlOutcome) -> u64 {
    summary.outcomes.get(&outcome).copied().unwrap_or(0)
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    // "/guide" and "/guide/" share one canonical URL; the external link is ignored
    mount_page(
        &mock_server,
        "/",
        html_page(
            "Toolkit Home",
            &format!("Welcome to the toolkit documentation home page. {}", FILLER),
            &["/guide", "/guide/", "/api", "https://elsewhere.example.org/page"],
        ),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/guide",
        html_page("User Guide", &format!("The user guide explains workflows. {}", FILLER), &["/"]),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/api",
        html_page(
            "API Reference",
            &format!("Reference material for every exported function. {}", FILLER),
            &["/guide"],
        ),
        1,
    )
    .await;

    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    let index_path = config.output.index_path.clone();
    let state_path = config.output.state_path.clone();
    let db_path = config.output.database_path.clone();

    let summary = crawl(config).await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.documents_indexed, 3);
    assert_eq!(outcome_count(&summary, CrawlOutcome::Indexed), 3);
    assert_eq!(summary.pages_processed, 3, "external link must not reach the ledger");
    assert_eq!(summary.queue_remaining, 0);

    let index = SearchIndex::load(Path::new(&index_path)).unwrap();
    assert_eq!(index.len(), 3);
    assert!(index.get(&format!("{}/guide", base)).is_some());
    assert!(index.get(&format!("{}/guide/", base)).is_none());

    let api = index.get(&format!("{}/api", base)).unwrap();
    assert_eq!(api.domain, "127.0.0.1");
    assert_eq!(api.depth, 1);

    let state = CrawlState::load(Path::new(&state_path)).unwrap().unwrap();
    assert!(state.is_pass_complete());
    assert_eq!(state.document_count, 3);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let run = storage.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.documents_indexed, 3);
    assert!(!CrawlLock::path_for(Path::new(&index_path)).exists());
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/",
        html_page("Public Docs", FILLER, &["/private/notes", "/public"]),
        1,
    )
    .await;
    mount_page(&mock_server, "/public", html_page("Public Page", FILLER, &[]), 1).await;
    mount_page(&mock_server, "/private/notes", html_page("Secret", FILLER, &[]), 0).await;

    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    let db_path = config.output.database_path.clone();
    let summary = crawl(config).await;

    assert_eq!(outcome_count(&summary, CrawlOutcome::Indexed), 2);
    assert_eq!(outcome_count(&summary, CrawlOutcome::DisallowedByRobots), 1);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let counts = storage.count_outcomes(summary.run_id).unwrap();
    assert_eq!(counts.get(&CrawlOutcome::DisallowedByRobots), Some(&1));
}

#[tokio::test]
async fn test_failures_are_recorded_not_fatal() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "/",
        html_page("Index", FILLER, &["/missing", "/tiny", "/image.png"]),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/tiny",
        "<html><head><title>Tiny</title></head><body><p>Short.</p></body></html>".to_string(),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    let db_path = config.output.database_path.clone();
    let summary = crawl(config).await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(outcome_count(&summary, CrawlOutcome::Indexed), 1);
    assert_eq!(outcome_count(&summary, CrawlOutcome::FetchFailed), 1);
    assert_eq!(outcome_count(&summary, CrawlOutcome::QualityRejected), 1);
    assert_eq!(outcome_count(&summary, CrawlOutcome::ContentMismatch), 1);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let failures = storage.recent_failures(summary.run_id, 10).unwrap();
    let missing = failures
        .iter()
        .find(|f| f.url.ends_with("/missing"))
        .expect("404 should be in the ledger");
    assert_eq!(missing.outcome, CrawlOutcome::FetchFailed);
    assert!(missing.detail.as_deref().unwrap_or("").contains("404"));
}

#[tokio::test]
async fn test_redirect_indexes_canonical_target() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/new",
        html_page("Moved Page", &format!("The page now lives here. {}", FILLER), &["/new"]),
        1,
    )
    .await;

    let config = create_test_config(dir.path(), vec![format!("{}/old", base)]);
    let index_path = config.output.index_path.clone();
    let summary = crawl(config).await;

    assert_eq!(outcome_count(&summary, CrawlOutcome::Indexed), 1);

    let index = SearchIndex::load(Path::new(&index_path)).unwrap();
    assert!(index.get(&format!("{}/new", base)).is_some());
    assert!(index.get(&format!("{}/old", base)).is_none());
}

#[tokio::test]
async fn test_resume_skips_seen_pages() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    // The seed was fetched by an earlier, interrupted run
    mount_page(&mock_server, "/", html_page("Home", FILLER, &["/next"]), 0).await;
    mount_page(
        &mock_server,
        "/next",
        html_page("Next Page", &format!("Resumed page content. {}", FILLER), &["/"]),
        1,
    )
    .await;

    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);

    let mut state = CrawlState::new();
    state.mark_seen(&format!("{}/", base));
    state.enqueue(format!("{}/next", base), 1);
    state.save(Path::new(&config.output.state_path)).unwrap();

    let index_path = config.output.index_path.clone();
    let summary = crawl(config).await;

    assert_eq!(summary.pages_processed, 1);
    assert_eq!(summary.documents_indexed, 1);

    let index = SearchIndex::load(Path::new(&index_path)).unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.get(&format!("{}/next", base)).is_some());
}

#[tokio::test]
async fn test_max_documents_leaves_queue_for_next_run() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", html_page("Home", FILLER, &["/a", "/b"]), 1).await;
    mount_page(&mock_server, "/a", html_page("Page A", FILLER, &[]), 0).await;
    mount_page(&mock_server, "/b", html_page("Page B", FILLER, &[]), 0).await;

    let mut config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    config.crawler.max_documents = 1;
    config.crawler.concurrent_requests = 1;
    let state_path = config.output.state_path.clone();

    let summary = crawl(config).await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.documents_indexed, 1);
    assert_eq!(summary.queue_remaining, 2);

    let state = CrawlState::load(Path::new(&state_path)).unwrap().unwrap();
    assert_eq!(state.queue_len(), 2);
    assert_eq!(state.document_count, 1);
}

#[tokio::test]
async fn test_whitelist_shrink_removes_documents() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", html_page("Home", FILLER, &[]), 1).await;

    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    let index_path = config.output.index_path.clone();

    let mut index = SearchIndex::new();
    index.add_document(
        Document::from_text(
            &Url::parse("https://docs.python.org/3/").unwrap(),
            "Python",
            "Python documentation from a domain that is no longer whitelisted.",
        )
        .unwrap(),
    );
    index.save(Path::new(&index_path)).unwrap();

    let summary = crawl(config).await;
    assert_eq!(summary.removed_by_whitelist, 1);

    let index = SearchIndex::load(Path::new(&index_path)).unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.get("https://docs.python.org/3/").is_none());
}

#[tokio::test]
async fn test_second_crawl_is_locked_out() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), vec!["http://127.0.0.1:1/".to_string()]);

    let _held = CrawlLock::acquire(Path::new(&config.output.index_path), false).unwrap();

    match Coordinator::new(config, "test-hash", CrawlOptions::default()) {
        Err(DocsiftError::Locked { .. }) => {}
        Err(e) => panic!("expected lock error, got {}", e),
        Ok(_) => panic!("expected lock error, got a coordinator"),
    }
}

/// Serves `route` slowly once, then promptly on later requests
async fn mount_slow_once(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body.clone()).set_delay(Duration::from_secs(10)))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn was_requested(server: &MockServer, route: &str) -> bool {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .any(|request| request.url.path() == route)
}

#[tokio::test]
async fn test_checkpoint_keeps_in_flight_page_and_shutdown_resumes() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/fast", html_page("Fast Page", FILLER, &[]), 1).await;
    mount_slow_once(&mock_server, "/slow", html_page("Slow Page", FILLER, &[])).await;

    let mut config = create_test_config(
        dir.path(),
        vec![format!("{}/fast", base), format!("{}/slow", base)],
    );
    config.crawler.checkpoint_interval = 1;
    let state_path = config.output.state_path.clone();
    let index_path = config.output.index_path.clone();

    let mut coordinator = Coordinator::new(config.clone(), "test-hash", CrawlOptions::default())
        .expect("Failed to create coordinator");
    let shutdown = coordinator.shutdown_handle();

    // Wait for the checkpoint written after /fast while /slow is still being served
    let observer = async {
        let give_up = Instant::now() + Duration::from_secs(5);
        let mut checkpoint_lists_slow = false;
        while Instant::now() < give_up {
            if was_requested(&mock_server, "/slow").await {
                if let Ok(Some(mut state)) = CrawlState::load(Path::new(&state_path)) {
                    if state.document_count == 1 {
                        checkpoint_lists_slow = state.queue_len() == 1
                            && state
                                .pop_next()
                                .is_some_and(|entry| entry.url.ends_with("/slow"));
                        break;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        shutdown.store(true, Ordering::SeqCst);
        checkpoint_lists_slow
    };

    let (summary, checkpoint_lists_slow) = tokio::join!(coordinator.run(), observer);
    let summary = summary.expect("Interrupted crawl should still succeed");
    drop(coordinator);

    assert!(checkpoint_lists_slow, "mid-run checkpoint lost the in-flight page");
    assert_eq!(summary.status, RunStatus::Interrupted);
    assert_eq!(summary.documents_indexed, 1);
    assert_eq!(summary.queue_remaining, 1);

    let state = CrawlState::load(Path::new(&state_path)).unwrap().unwrap();
    assert_eq!(state.queue_len(), 1);

    let resumed = crawl(config).await;
    assert_eq!(resumed.status, RunStatus::Completed);
    assert_eq!(resumed.pages_processed, 1);
    assert_eq!(resumed.documents_indexed, 1);

    let index = SearchIndex::load(Path::new(&index_path)).unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.get(&format!("{}/slow", base)).is_some());
}

#[tokio::test]
async fn test_time_budget_flushes_state_for_next_run() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_slow_once(
        &mock_server,
        "/",
        html_page("Slow Home", &format!("Home page content. {}", FILLER), &["/next"]),
    )
    .await;
    mount_page(&mock_server, "/next", html_page("Next Page", FILLER, &[]), 1).await;

    let mut config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    config.crawler.time_budget = Some(1);
    let state_path = config.output.state_path.clone();
    let db_path = config.output.database_path.clone();

    let interrupted = crawl(config.clone()).await;
    assert_eq!(interrupted.status, RunStatus::Interrupted);
    assert_eq!(interrupted.pages_processed, 0);
    assert_eq!(interrupted.queue_remaining, 1);
    assert!(was_requested(&mock_server, "/").await);

    let state = CrawlState::load(Path::new(&state_path)).unwrap().unwrap();
    assert_eq!(state.queue_len(), 1);
    assert!(state.is_seen(&format!("{}/", base)));

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let run = storage.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    drop(storage);

    config.crawler.time_budget = None;
    let resumed = crawl(config).await;
    assert_eq!(resumed.status, RunStatus::Completed);
    assert_eq!(resumed.documents_indexed, 2);
    assert_eq!(resumed.queue_remaining, 0);
}

#[tokio::test]
async fn test_robots_crawl_delay_spaces_requests() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1\n"))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", html_page("Home", FILLER, &["/a", "/b"]), 1).await;
    mount_page(&mock_server, "/a", html_page("Page A", FILLER, &[]), 1).await;
    mount_page(&mock_server, "/b", html_page("Page B", FILLER, &[]), 1).await;

    // Three pages on one host at a 1s crawl-delay; the 100ms default alone would take ~0.2s
    let config = create_test_config(dir.path(), vec![format!("{}/", base)]);
    let started = Instant::now();
    let summary = crawl(config).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome_count(&summary, CrawlOutcome::Indexed), 3);
    assert!(
        elapsed >= Duration::from_millis(1900),
        "three requests finished in {:?}",
        elapsed
    );
}
