//! Statistics for the index and the crawl ledger
//!
//! This module gathers what the `stats` command shows: index size and
//! composition plus the outcome breakdown of the latest crawl run.

use crate::crawler::CrawlSummary;
use crate::index::{IndexStats, SearchIndex};
use crate::state::CrawlOutcome;
use crate::storage::{OutcomeRecord, RunRecord, Storage, StorageResult};
use std::collections::HashMap;
use std::fmt::Write;

/// Failures listed under the latest run
const RECENT_FAILURES_SHOWN: usize = 10;

/// Combined index and ledger statistics
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub index: IndexStats,

    /// Most recent crawl run, if any was recorded
    pub latest_run: Option<RunRecord>,

    /// Outcome counts for the latest run
    pub outcomes: HashMap<CrawlOutcome, u64>,

    pub recent_failures: Vec<OutcomeRecord>,
}

/// Loads statistics from the index and the ledger
pub fn load_statistics(index: &SearchIndex, storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    let latest_run = storage.latest_run()?;

    let (outcomes, recent_failures) = match &latest_run {
        Some(run) => (
            storage.count_outcomes(run.id)?,
            storage.recent_failures(run.id, RECENT_FAILURES_SHOWN)?,
        ),
        None => (HashMap::new(), Vec::new()),
    };

    Ok(CrawlStatistics {
        index: index.get_stats(),
        latest_run,
        outcomes,
        recent_failures,
    })
}

/// Formats statistics as a plain-text report
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();
    let index = &stats.index;

    let _ = writeln!(out, "=== Index Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Documents: {}", index.document_count);
    let _ = writeln!(out, "  Unique terms: {}", index.unique_terms);
    let _ = writeln!(out, "  Content characters: {}", index.total_content_chars);
    match index.updated_at {
        Some(updated) => {
            let _ = writeln!(out, "  Last updated: {}", updated.to_rfc3339());
        }
        None => {
            let _ = writeln!(out, "  Last updated: never");
        }
    }
    let _ = writeln!(out);

    if !index.documents_by_domain.is_empty() {
        let _ = writeln!(out, "Documents by Domain:");
        let mut domains: Vec<_> = index.documents_by_domain.iter().collect();
        domains.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (domain, count) in domains {
            let _ = writeln!(out, "  {}: {}", domain, count);
        }
        let _ = writeln!(out);
    }

    if !index.documents_by_type.is_empty() {
        let _ = writeln!(out, "Documents by Content Type:");
        for (content_type, count) in &index.documents_by_type {
            let _ = writeln!(out, "  {}: {}", content_type, count);
        }
        let _ = writeln!(out);
    }

    let Some(run) = &stats.latest_run else {
        let _ = writeln!(out, "No crawl runs recorded.");
        return out;
    };

    let _ = writeln!(out, "Latest Run (#{}):", run.id);
    let _ = writeln!(out, "  Status: {}", run.status.to_db_string());
    let _ = writeln!(out, "  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        let _ = writeln!(out, "  Finished: {}", finished);
    }
    let _ = writeln!(out, "  Documents indexed: {}", run.documents_indexed);
    let _ = writeln!(out, "  Config hash: {}", run.config_hash);
    let _ = writeln!(out);

    out.push_str(&format_outcomes(&stats.outcomes));

    if !stats.recent_failures.is_empty() {
        let _ = writeln!(out, "Recent Failures:");
        for failure in &stats.recent_failures {
            let _ = writeln!(
                out,
                "  [{}] {}{}",
                failure.outcome,
                failure.url,
                failure
                    .detail
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            );
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}

fn format_outcomes(outcomes: &HashMap<CrawlOutcome, u64>) -> String {
    let mut out = String::new();
    let total: u64 = outcomes.values().sum();
    if total == 0 {
        return out;
    }

    let _ = writeln!(out, "Outcomes:");
    let mut counts: Vec<_> = outcomes.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_db_string().cmp(b.0.to_db_string())));
    for (outcome, count) in counts {
        let percentage = (*count as f64 / total as f64) * 100.0;
        let _ = writeln!(out, "  {}: {} ({:.1}%)", outcome, count, percentage);
    }

    let indexed = outcomes.get(&CrawlOutcome::Indexed).copied().unwrap_or(0);
    let _ = writeln!(
        out,
        "\nSuccess Rate: {:.1}% ({} / {} pages indexed)\n",
        (indexed as f64 / total as f64) * 100.0,
        indexed,
        total
    );
    out
}

/// Prints the end-of-run summary of a crawl
pub fn print_crawl_summary(summary: &CrawlSummary) {
    println!("=== Crawl Run #{} ===\n", summary.run_id);
    println!("  Status: {}", summary.status.to_db_string());
    println!("  Pages processed: {}", summary.pages_processed);
    println!("  Documents indexed: {}", summary.documents_indexed);
    println!("  Index size: {}", summary.index_size);
    println!("  Still queued: {}", summary.queue_remaining);
    if summary.removed_by_whitelist > 0 {
        println!(
            "  Removed (no longer whitelisted): {}",
            summary.removed_by_whitelist
        );
    }
    println!("  Elapsed: {:.1}s\n", summary.elapsed.as_secs_f64());
    print!("{}", format_outcomes(&summary.outcomes));
}
