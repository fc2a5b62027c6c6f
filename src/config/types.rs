use serde::Deserialize;

/// Browser-like user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Main configuration structure for Coin-Pulse
///
/// Every section is optional in the TOML file; missing sections fall back
/// to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub scraper: ScraperConfig,
    pub poller: PollerConfig,
    pub output: OutputConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User agent presented to every endpoint
    pub user_agent: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// TCP connect timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            connect_timeout_secs: 10,
        }
    }
}

/// Retry policy for the resilient fetcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Maximum number of attempts per logical request
    pub max_attempts: u32,

    /// Delay before the first retry (seconds), doubled after each failure
    pub initial_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_secs: 1,
        }
    }
}

/// Listing scraper configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScraperConfig {
    /// Number of listing pages to visit
    pub max_pages: usize,

    /// Rendered listing page for the browser-driven strategy
    pub listing_url: String,

    /// JSON listing endpoint for the API strategy
    pub api_url: String,

    /// Records per API page
    pub page_size: usize,

    /// Pixels scrolled per wheel step
    pub scroll_step_px: u32,

    /// Wait after each scroll step (milliseconds)
    pub scroll_settle_ms: u64,

    /// Maximum scroll steps per page before extraction
    pub max_scroll_attempts: u32,

    /// How long to wait for the coin table to appear (seconds)
    pub table_wait_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            listing_url: "https://coinmarketcap.com".to_string(),
            api_url: "https://api.coinmarketcap.com/data-api/v3/cryptocurrency/listing"
                .to_string(),
            page_size: 100,
            scroll_step_px: 2000,
            scroll_settle_ms: 1000,
            max_scroll_attempts: 30,
            table_wait_secs: 30,
        }
    }
}

/// Price poller configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PollerConfig {
    /// Simple-price endpoint
    pub price_url: String,

    /// Coin identifier understood by the endpoint
    pub coin_id: String,

    /// Quote currency
    pub vs_currency: String,

    /// Seconds between polls
    pub interval_secs: u64,

    /// Number of prices to collect before stopping
    pub amount: usize,

    /// Trailing window length for the moving average
    pub sma_period: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            price_url: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            coin_id: "bitcoin".to_string(),
            vs_currency: "usd".to_string(),
            interval_secs: 1,
            amount: 10,
            sma_period: 10,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the CSV file
    pub csv_path: String,

    /// Path to the SQLite database file
    pub sqlite_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: "watchlist.csv".to_string(),
            sqlite_path: "watchlist.db".to_string(),
        }
    }
}
