//! Output module for operator-facing reports
//!
//! This module handles:
//! - Index and ledger statistics for the `stats` command
//! - The end-of-run crawl summary

pub mod stats;

pub use stats::{
    format_statistics, load_statistics, print_crawl_summary, print_statistics, CrawlStatistics,
};
