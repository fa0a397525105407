//! Robots.txt parser implementation
//!
//! Allow/deny decisions are delegated to the robotstxt crate's matcher so
//! precedence follows Google's reference behavior. Rule lists and the
//! crawl-delay are extracted here for the group that applies to our agent.

use chrono::{DateTime, Duration, Utc};
use robotstxt::DefaultMatcher;
use std::time::Duration as StdDuration;

/// Policies older than this are refetched before use
pub const ROBOTS_TTL_HOURS: i64 = 24;

/// Upper bound on a site-declared crawl-delay
///
/// A hostile or mistyped robots.txt must not stall a host for hours.
const MAX_CRAWL_DELAY_SECS: f64 = 60.0;

/// Parsed robots.txt policy for one host
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content (empty means allow all)
    content: String,

    /// Agent token the rules were selected for
    agent: String,

    /// Allow paths from the group that applies to our agent
    pub allow_rules: Vec<String>,

    /// Disallow paths from the group that applies to our agent
    pub disallow_rules: Vec<String>,

    /// Crawl-delay in seconds, if declared for our agent or `*`
    pub crawl_delay_seconds: Option<f64>,

    /// When the policy was fetched
    pub fetched_at: DateTime<Utc>,

    /// How long the policy may be relied upon
    pub ttl: Duration,
}

impl RobotsPolicy {
    /// Parses robots.txt content for the given agent token
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `agent` - Product token of our user agent (e.g. "Docsift")
    pub fn parse(content: &str, agent: &str) -> Self {
        let groups = parse_groups(content);
        let agent_lc = agent.to_ascii_lowercase();

        // A group naming our agent replaces the wildcard group entirely
        let specific: Vec<&Group> = groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && agent_matches(a, &agent_lc)))
            .collect();
        let selected: Vec<&Group> = if specific.is_empty() {
            groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            specific
        };

        let mut allow_rules = Vec::new();
        let mut disallow_rules = Vec::new();
        let mut crawl_delay_seconds = None;

        for group in selected {
            allow_rules.extend(group.allow.iter().cloned());
            disallow_rules.extend(group.disallow.iter().cloned());
            if crawl_delay_seconds.is_none() {
                crawl_delay_seconds = group.crawl_delay;
            }
        }

        Self {
            content: content.to_string(),
            agent: agent.to_string(),
            allow_rules,
            disallow_rules,
            crawl_delay_seconds,
            fetched_at: Utc::now(),
            ttl: Duration::hours(ROBOTS_TTL_HOURS),
        }
    }

    /// Creates a permissive policy with no crawl-delay
    ///
    /// This is the fail-open result when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            agent: String::new(),
            allow_rules: Vec::new(),
            disallow_rules: Vec::new(),
            crawl_delay_seconds: None,
            fetched_at: Utc::now(),
            ttl: Duration::hours(ROBOTS_TTL_HOURS),
        }
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if a URL is allowed for our agent
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path to check
    ///
    /// # Returns
    ///
    /// * `true` - If the URL may be fetched
    /// * `false` - If robots.txt disallows it
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.content.trim().is_empty() || self.agent.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url)
    }

    /// Crawl-delay as a duration, capped to a sane maximum
    pub fn crawl_delay(&self) -> Option<StdDuration> {
        self.crawl_delay_seconds
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| StdDuration::from_secs_f64(secs.min(MAX_CRAWL_DELAY_SECS)))
    }

    /// Whether the policy has outlived its TTL at `now`
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at >= self.ttl
    }

    /// Whether the policy has outlived its TTL
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

/// Splits robots.txt into user-agent groups
///
/// Consecutive `User-agent` lines share one group; the first rule line closes
/// the agent list so the next `User-agent` starts a new group.
fn parse_groups(content: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut current: Option<Group> = None;
    let mut collecting_agents = false;

    for line in content.lines() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        }
        .trim();

        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !collecting_agents {
                    if let Some(group) = current.take() {
                        groups.push(group);
                    }
                    current = Some(Group::default());
                    collecting_agents = true;
                }
                if let Some(group) = current.as_mut() {
                    group.agents.push(value.to_ascii_lowercase());
                }
            }
            "allow" | "disallow" | "crawl-delay" => {
                collecting_agents = false;
                let Some(group) = current.as_mut() else {
                    continue;
                };
                match key.as_str() {
                    "allow" if !value.is_empty() => group.allow.push(value.to_string()),
                    "disallow" if !value.is_empty() => group.disallow.push(value.to_string()),
                    "crawl-delay" => {
                        if let Ok(delay) = value.parse::<f64>() {
                            group.crawl_delay = Some(delay);
                        }
                    }
                    _ => {}
                }
            }
            _ => {
                collecting_agents = false;
            }
        }
    }

    if let Some(group) = current {
        groups.push(group);
    }

    groups
}

fn agent_matches(line_agent: &str, agent_lc: &str) -> bool {
    let token = line_agent.split('/').next().unwrap_or(line_agent).trim();
    !token.is_empty() && token == agent_lc
}
