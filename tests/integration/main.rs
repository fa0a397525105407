//! Integration tests for docsift
//!
//! Crawls run against wiremock servers on 127.0.0.1, which the SSRF guard
//! only permits through `security.allow-hosts`.

mod crawl_tests;
mod query_tests;

use docsift::config::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, SearchConfig, SecurityConfig,
    UserAgentConfig,
};
use std::path::Path;

/// Creates a test configuration rooted at `dir` that crawls from `seeds`
pub fn create_test_config(dir: &Path, seeds: Vec<String>) -> Config {
    let path = |name: &str| dir.join(name).display().to_string();

    Config {
        domains: vec!["127.0.0.1".to_string()],
        seeds,
        crawler: CrawlerConfig {
            max_depth: 2,
            max_documents: 100,
            delay: 100,
            timeout: 5_000,
            concurrent_requests: 2,
            respect_robots: true,
            time_budget: None,
            checkpoint_interval: 2,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            index_path: path("index.json"),
            state_path: path("state.json"),
            database_path: path("ledger.db"),
        },
        extraction: ExtractionConfig {
            min_content_length: 80,
            excerpt_length: 200,
        },
        search: SearchConfig {
            default_limit: 10,
            max_limit: 50,
        },
        security: SecurityConfig {
            allow_hosts: vec!["127.0.0.1".to_string()],
        },
    }
}

/// An HTML page with a title, one paragraph of body text and some links
pub fn html_page(title: &str, body: &str, links: &[&str]) -> String {
    let links: String = links
        .iter()
        .map(|href| format!("<li><a href=\"{href}\">{href}</a></li>"))
        .collect();

    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body>\
         <nav><ul>{links}</ul></nav>\
         <main><h1>{title}</h1><p>{body}</p></main>\
         </body></html>"
    )
}
