//! Configuration module for Coin-Pulse
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; command-line flags are layered on top by the binary
//! and the merged result is re-checked with [`validate`].
//!
//! # Example
//!
//! ```no_run
//! use coin_pulse::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("coin-pulse.toml")).unwrap();
//! println!("Retrying up to {} times", config.retry.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, HttpConfig, OutputConfig, PollerConfig, RetryConfig, ScraperConfig,
    DEFAULT_USER_AGENT,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
