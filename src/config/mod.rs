//! Configuration module for Docsift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use docsift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("docsift.toml")).unwrap();
//! println!("Whitelist: {:?}", config.domains);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, SearchConfig, SecurityConfig,
    UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate_domain_string;
