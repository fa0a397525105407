//! Docsift main entry point
//!
//! Command-line interface for crawling documentation sites and querying the
//! resulting full-text index.

use anyhow::Context;
use clap::{Parser, Subcommand};
use docsift::config::{load_config, load_config_with_hash, Config};
use docsift::crawler::{run_crawl, CrawlLock, CrawlOptions};
use docsift::index::SearchIndex;
use docsift::query::{run_query, QueryError, QueryRequest, ToolError};
use docsift::storage::open_storage;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Docsift: a domain-restricted documentation crawler and search index
///
/// Docsift crawls whitelisted documentation sites while respecting
/// robots.txt and per-host rate limits, and keeps a BM25 index on disk
/// that can be queried without a running service.
#[derive(Parser, Debug)]
#[command(name = "docsift")]
#[command(version)]
#[command(about = "A polite documentation crawler and search index", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured domains and update the index
    Crawl {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Start a new pass, ignoring saved crawl state
        #[arg(long)]
        fresh: bool,

        /// Remove a stale lock left by a crashed run
        #[arg(long)]
        break_lock: bool,
    },

    /// Search the index and print results as JSON
    Query {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Search terms
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only return documents from this domain or its subdomains
        #[arg(short, long)]
        domain: Option<String>,

        /// Drop results scoring below this value
        #[arg(long, default_value_t = 0.0)]
        min_score: f64,

        /// Skip this many results (pagination)
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show index and crawl ledger statistics
    Stats {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Remove a single document from the index
    Remove {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// URL of the document to remove
        url: String,
    },

    /// Validate the configuration and show what would be crawled
    Check {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Query output is machine-read; keep stderr quiet unless asked
    let is_query = matches!(cli.command, Command::Query { .. });
    setup_logging(cli.verbose, cli.quiet, is_query);

    let result = match cli.command {
        Command::Crawl {
            config,
            fresh,
            break_lock,
        } => handle_crawl(&config, CrawlOptions { fresh, break_lock }).await,
        Command::Query {
            config,
            query,
            limit,
            domain,
            min_score,
            offset,
        } => {
            let request = QueryRequest {
                query,
                limit,
                domain,
                min_score,
                offset,
            };
            return handle_query(&config, &request);
        }
        Command::Stats { config } => handle_stats(&config),
        Command::Remove { config, url } => handle_remove(&config, &url),
        Command::Check { config } => handle_check(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            if let Some(code) = e.downcast_ref::<docsift::DocsiftError>().map(|e| e.code()) {
                eprintln!("error [{}]: {:#}\n  remedy: {}", code, e, code.remedy());
            } else {
                eprintln!("error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs always go to stderr so stdout stays clean for query JSON.
fn setup_logging(verbose: u8, quiet: bool, is_query: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else {
        match (verbose, is_query) {
            (0, true) => EnvFilter::new("warn"),
            (0, false) => EnvFilter::new("docsift=info,warn"),
            (1, _) => EnvFilter::new("docsift=debug,info"),
            (2, _) => EnvFilter::new("docsift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load(path: &Path) -> anyhow::Result<(Config, String)> {
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path).map_err(docsift::DocsiftError::from)?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok((config, hash))
}

/// Runs one crawl pass (or resumes one) and prints the run summary
async fn handle_crawl(path: &Path, options: CrawlOptions) -> anyhow::Result<()> {
    let (config, hash) = load(path)?;

    if options.fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if saved state exists)");
    }
    tracing::info!(
        "Domains: {}, seed URLs: {}",
        config.domains.len(),
        config.seeds.len()
    );

    let summary = run_crawl(config, &hash, options).await?;
    docsift::output::print_crawl_summary(&summary);
    Ok(())
}

/// Answers one query: JSON array on stdout, structured error on stderr
fn handle_query(path: &Path, request: &QueryRequest) -> ExitCode {
    let outcome = load_config(path)
        .map_err(QueryError::from)
        .and_then(|config| run_query(&config, request));

    match outcome {
        Ok(results) => match serde_json::to_string_pretty(&results) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{{\"code\":\"io_error\",\"message\":\"{}\"}}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            let tool_error = ToolError::from(&e);
            match serde_json::to_string(&tool_error) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn handle_stats(path: &Path) -> anyhow::Result<()> {
    use docsift::output::{load_statistics, print_statistics};

    let (config, _) = load(path)?;
    let index_path = Path::new(&config.output.index_path);

    println!("Index: {}", config.output.index_path);
    println!("Database: {}\n", config.output.database_path);

    let index = SearchIndex::load_or_default(index_path)
        .with_context(|| format!("reading index {}", index_path.display()))?;
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("opening crawl ledger")?;

    let stats = load_statistics(&index, &storage)?;
    print_statistics(&stats);
    Ok(())
}

/// Drops one document from the index under the crawl lock
fn handle_remove(path: &Path, raw_url: &str) -> anyhow::Result<()> {
    let (config, _) = load(path)?;
    let index_path = Path::new(&config.output.index_path);

    let url = docsift::normalize_url(raw_url).map_err(docsift::DocsiftError::from)?;
    let _lock = CrawlLock::acquire(index_path, false)?;

    let mut index = SearchIndex::load(index_path).map_err(docsift::DocsiftError::from)?;
    if index.remove_by_url(url.as_str()) {
        index.save(index_path).map_err(docsift::DocsiftError::from)?;
        println!("Removed {} ({} documents remain)", url, index.len());
    } else {
        println!("No document indexed at {}", url);
    }
    Ok(())
}

/// Validates config and shows what would be crawled
fn handle_check(path: &Path) -> anyhow::Result<()> {
    let (config, hash) = load(path)?;

    println!("=== Docsift Configuration Check ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max documents: {}", config.crawler.max_documents);
    println!("  Delay: {}ms", config.crawler.delay);
    println!("  Timeout: {}ms", config.crawler.timeout);
    println!("  Concurrent requests: {}", config.crawler.concurrent_requests);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    match config.crawler.time_budget {
        Some(budget) => println!("  Time budget: {}s", budget),
        None => println!("  Time budget: none"),
    }
    println!(
        "  Checkpoint interval: {} pages",
        config.crawler.checkpoint_interval
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Index: {}", config.output.index_path);
    println!("  State: {}", config.output.state_path);
    println!("  Database: {}", config.output.database_path);

    println!("\nWhitelisted Domains ({}):", config.domains.len());
    for domain in &config.domains {
        println!("  - {}", domain);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  * {}", seed);
    }

    if !config.security.allow_hosts.is_empty() {
        println!("\nAllowed private hosts ({}):", config.security.allow_hosts.len());
        for host in &config.security.allow_hosts {
            println!("  - {}", host);
        }
    }

    println!("\n✓ Configuration is valid (hash: {})", hash);
    println!("✓ Would start crawling with {} seed URLs", config.seeds.len());

    Ok(())
}
