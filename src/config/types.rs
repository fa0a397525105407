use serde::Deserialize;

/// Main configuration structure for Docsift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Whitelisted domains; a host matches an entry or any of its subdomains
    pub domains: Vec<String>,

    /// URLs the crawl starts from
    #[serde(default)]
    pub seeds: Vec<String>,

    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum BFS distance from a seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Stop once this many documents have been indexed in the current pass
    #[serde(rename = "max-documents")]
    pub max_documents: u32,

    /// Minimum time between requests to the same host (milliseconds)
    pub delay: u64,

    /// Per-request timeout for pages and robots.txt (milliseconds)
    pub timeout: u64,

    /// Number of fetches allowed in flight across different hosts
    #[serde(rename = "concurrent-requests", default = "default_concurrent_requests")]
    pub concurrent_requests: u32,

    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Wall-clock budget for a run (seconds); state is flushed when it runs out
    #[serde(rename = "time-budget", default)]
    pub time_budget: Option<u64>,

    /// Pages processed between crawl-state checkpoints
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSON index file (documents + ranking structures)
    #[serde(rename = "index-path")]
    pub index_path: String,

    /// JSON crawl-state file (queue, seen set, progress)
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// SQLite crawl ledger
    #[serde(rename = "database-path")]
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(rename = "min-content-length", default = "default_min_content_length")]
    pub min_content_length: usize,

    #[serde(rename = "excerpt-length", default = "default_excerpt_length")]
    pub excerpt_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_length: default_min_content_length(),
            excerpt_length: default_excerpt_length(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,

    #[serde(rename = "max-limit", default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// SSRF guard overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Hosts that bypass the private-network check (local fixtures only)
    #[serde(rename = "allow-hosts", default)]
    pub allow_hosts: Vec<String>,
}

fn default_concurrent_requests() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_checkpoint_interval() -> u32 {
    10
}

fn default_min_content_length() -> usize {
    200
}

fn default_excerpt_length() -> usize {
    200
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    100
}
