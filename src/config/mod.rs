//! Configuration module for Siteprobe
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use siteprobe::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("siteprobe.toml")).unwrap();
//! println!("Crawling enabled: {}", config.crawl.enabled);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, FetchConfig, LogsConfig, ProviderConfig, ProviderKind, ReportConfig,
    RequestMethod, SessionConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub(crate) use types::default_redact_tokens;
pub(crate) use validation::is_sql_identifier;
