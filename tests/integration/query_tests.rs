//! Integration tests for the query tool against a persisted index

use crate::create_test_config;
use docsift::index::{Document, SearchIndex};
use docsift::query::{run_query, QueryRequest, ToolError};
use docsift::{Config, ErrorCode};
use std::path::Path;
use tempfile::TempDir;
use url::Url;

fn doc(url: &str, title: &str, content: &str) -> Document {
    Document::from_text(&Url::parse(url).unwrap(), title, content).unwrap()
}

/// Writes a small three-site index and returns a config pointing at it
fn fixture(dir: &TempDir) -> Config {
    let config = create_test_config(dir.path(), vec![]);

    let mut index = SearchIndex::new();
    index.add_document(doc(
        "https://docs.python.org/3/tutorial/index.html",
        "The Python Tutorial",
        "Python is an easy to learn, powerful programming language. It has efficient \
         high-level data structures and a simple but effective approach to \
         object-oriented programming.",
    ));
    index.add_document(doc(
        "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Guide",
        "JavaScript Guide",
        "The JavaScript Guide shows you how to use JavaScript and gives an overview of \
         the language. JavaScript runs in every modern browser.",
    ));
    index.add_document(doc(
        "https://developer.mozilla.org/en-US/docs/Web/API",
        "Web APIs",
        "When writing code for the Web, there are a large number of Web APIs available. \
         Most of them are used from JavaScript.",
    ));
    index.add_document(doc(
        "https://man7.org/linux/man-pages/man7/inode.7.html",
        "inode(7) - Linux manual page",
        "Each file has an inode containing metadata about the file. An application can \
         retrieve this metadata using stat(2) or related calls.",
    ));
    index
        .save(Path::new(&config.output.index_path))
        .expect("Failed to save fixture index");

    config
}

#[test]
fn test_single_match() {
    let dir = TempDir::new().unwrap();
    let config = fixture(&dir);

    let results = run_query(&config, &QueryRequest::new("python")).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].domain, "docs.python.org");
    assert_eq!(results[0].title, "The Python Tutorial");
    assert!(results[0].score > 0.0);
    assert!(results[0].snippet.to_lowercase().contains("python"));
}

#[test]
fn test_no_match_is_empty_not_error() {
    let dir = TempDir::new().unwrap();
    let config = fixture(&dir);

    let results = run_query(&config, &QueryRequest::new("nonexistent-term-zzz")).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_title_match_outranks_body_match() {
    let dir = TempDir::new().unwrap();
    let config = fixture(&dir);

    let results = run_query(&config, &QueryRequest::new("javascript")).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "JavaScript Guide");
    assert_eq!(results[1].title, "Web APIs");
    assert!(results[0].score > results[1].score);
}

#[test]
fn test_domain_filter_and_pagination() {
    let dir = TempDir::new().unwrap();
    let config = fixture(&dir);

    let mut request = QueryRequest::new("web javascript metadata");
    request.domain = Some("mozilla.org".to_string());
    let all = run_query(&config, &request).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.domain == "developer.mozilla.org"));

    request.limit = Some(1);
    request.offset = 1;
    let page = run_query(&config, &request).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].url, all[1].url);

    request.offset = 5;
    assert!(run_query(&config, &request).unwrap().is_empty());
}

#[test]
fn test_prefix_match() {
    let dir = TempDir::new().unwrap();
    let config = fixture(&dir);

    let results = run_query(&config, &QueryRequest::new("metad")).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].url.contains("inode"));
}

#[test]
fn test_limit_exceeded_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = fixture(&dir);

    let mut request = QueryRequest::new("python");
    request.limit = Some(config.search.max_limit + 1);

    let err = run_query(&config, &request).unwrap_err();
    assert_eq!(err.code(), ErrorCode::LimitExceeded);
}

#[test]
fn test_corrupted_index_reports_code() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), vec![]);
    std::fs::write(&config.output.index_path, "{ not json").unwrap();

    let err = run_query(&config, &QueryRequest::new("python")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndexCorrupted);

    let json = serde_json::to_value(ToolError::from(&err)).unwrap();
    assert_eq!(json["code"], "index_corrupted");
}

#[test]
fn test_schema_mismatch_reports_code() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), vec![]);
    std::fs::write(
        &config.output.index_path,
        r#"{"schema_version": 999, "documents": {}}"#,
    )
    .unwrap();

    let err = run_query(&config, &QueryRequest::new("python")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SchemaMismatch);
}
