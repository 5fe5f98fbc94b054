//! Configuration module
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so running without a file is
//! the common case.
//!
//! # Example
//!
//! ```no_run
//! use ao3_history::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ao3-history.toml")).unwrap();
//! println!("Scraping {}", config.site.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, PaginationConfig, ProbeConfig, RetryConfig, SessionConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_or_default, parse_config};
