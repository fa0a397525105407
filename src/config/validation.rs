use crate::config::types::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, SearchConfig, UserAgentConfig,
};
use crate::url::is_whitelisted;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_extraction_config(&config.extraction)?;
    validate_search_config(&config.search)?;
    validate_domains(&config.domains)?;
    validate_seeds(&config.seeds, &config.domains)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_documents < 1 {
        return Err(ConfigError::Validation(
            "max_documents must be >= 1".to_string(),
        ));
    }

    if config.delay < 100 {
        return Err(ConfigError::Validation(format!(
            "delay must be >= 100ms, got {}ms",
            config.delay
        )));
    }

    if !(1_000..=120_000).contains(&config.timeout) {
        return Err(ConfigError::Validation(format!(
            "timeout must be between 1000ms and 120000ms, got {}ms",
            config.timeout
        )));
    }

    if config.concurrent_requests < 1 || config.concurrent_requests > 32 {
        return Err(ConfigError::Validation(format!(
            "concurrent_requests must be between 1 and 32, got {}",
            config.concurrent_requests
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    if config.time_budget == Some(0) {
        return Err(ConfigError::Validation(
            "time_budget must be > 0 seconds when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("index_path", &config.index_path),
        ("state_path", &config.state_path),
        ("database_path", &config.database_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.index_path == config.state_path {
        return Err(ConfigError::Validation(
            "index_path and state_path must be different files".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.min_content_length < 1 {
        return Err(ConfigError::Validation(
            "min_content_length must be >= 1".to_string(),
        ));
    }

    if !(40..=1000).contains(&config.excerpt_length) {
        return Err(ConfigError::Validation(format!(
            "excerpt_length must be between 40 and 1000, got {}",
            config.excerpt_length
        )));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.max_limit < 1 {
        return Err(ConfigError::Validation("max_limit must be >= 1".to_string()));
    }

    if config.default_limit < 1 || config.default_limit > config.max_limit {
        return Err(ConfigError::Validation(format!(
            "default_limit must be between 1 and max_limit ({}), got {}",
            config.max_limit, config.default_limit
        )));
    }

    Ok(())
}

/// Validates the domain whitelist
fn validate_domains(domains: &[String]) -> Result<(), ConfigError> {
    if domains.is_empty() {
        return Err(ConfigError::Validation(
            "domains must list at least one whitelisted domain".to_string(),
        ));
    }

    for domain in domains {
        validate_domain_string(domain)?;
    }

    Ok(())
}

/// Validates seed URLs: absolute http(s) and inside the whitelist
fn validate_seeds(seeds: &[String], domains: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidUrl(format!("Seed URL '{}' has no host", seed)))?;

        if !is_whitelisted(host, domains) {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' is outside the domain whitelist",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates a whitelist domain string
///
/// Wildcards are rejected: an entry already covers its subdomains.
pub fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' must be lowercase",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' must contain at least one dot (e.g., 'docs.python.org')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domain_string() {
        assert!(validate_domain_string("docs.python.org").is_ok());
        assert!(validate_domain_string("man7.org").is_ok());
        assert!(validate_domain_string("127.0.0.1").is_ok());

        assert!(validate_domain_string("").is_err());
        assert!(validate_domain_string("*.python.org").is_err());
        assert!(validate_domain_string("python").is_err());
        assert!(validate_domain_string(".python.org").is_err());
        assert!(validate_domain_string("python.org.").is_err());
        assert!(validate_domain_string("Docs.Python.org").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }

    #[test]
    fn test_seed_outside_whitelist_rejected() {
        let domains = vec!["docs.python.org".to_string()];
        assert!(validate_seeds(&["https://docs.python.org/3/".to_string()], &domains).is_ok());
        assert!(validate_seeds(&["https://evil.com/".to_string()], &domains).is_err());
        assert!(validate_seeds(&["ftp://docs.python.org/".to_string()], &domains).is_err());
    }

    #[test]
    fn test_empty_whitelist_rejected() {
        assert!(validate_domains(&[]).is_err());
    }
}
