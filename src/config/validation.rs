use crate::config::types::{
    Config, HttpConfig, OutputConfig, PollerConfig, RetryConfig, ScraperConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_retry_config(&config.retry)?;
    validate_scraper_config(&config.scraper)?;
    validate_poller_config(&config.poller)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    validate_http_url("listing_url", &config.listing_url)?;
    validate_http_url("api_url", &config.api_url)?;

    Ok(())
}

fn validate_poller_config(config: &PollerConfig) -> Result<(), ConfigError> {
    validate_http_url("price_url", &config.price_url)?;

    if config.coin_id.is_empty() || config.vs_currency.is_empty() {
        return Err(ConfigError::Validation(
            "coin_id and vs_currency cannot be empty".to_string(),
        ));
    }

    if config.sma_period < 1 {
        return Err(ConfigError::Validation(format!(
            "sma_period must be >= 1, got {}",
            config.sma_period
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv_path cannot be empty".to_string(),
        ));
    }

    if config.sqlite_path.is_empty() {
        return Err(ConfigError::Validation(
            "sqlite_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a configured endpoint parses and uses HTTP(S)
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
