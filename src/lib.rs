//! Coin-Pulse: resilient cryptocurrency market data collection
//!
//! This crate fetches coin listings from a paginated web page and a JSON
//! listing API, polls a live price endpoint, and hands normalized records
//! to CSV and SQLite sinks.

pub mod config;
pub mod fetch;
pub mod output;
pub mod poller;
pub mod scraper;
pub mod state;

use thiserror::Error;

/// Main error type for Coin-Pulse operations
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Pagination control missing after page {page}")]
    PaginationControlMissing { page: usize },

    #[error("JSON parse error for {url}: {source}")]
    JsonParse {
        url: String,
        source: serde_json::Error,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

impl From<chromiumoxide::error::CdpError> for PulseError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        PulseError::Browser(err.to_string())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Coin-Pulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FetchOutcome, FetchRequest, ResilientFetcher};
pub use output::RecordSink;
pub use poller::{PollSettings, PricePoller};
pub use scraper::{CoinRecord, ScrapeRun, ScraperOrchestrator};
pub use state::CancellationToken;
