//! Simple-price endpoint request and response decoding
//!
//! The endpoint answers `{"<coin>": {"<vs>": 64012.5, "last_updated_at": 1718000000}}`.

use crate::config::PollerConfig;
use crate::fetch::FetchRequest;
use crate::{PulseError, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// One observed price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTick {
    /// Always > 0
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Which coin to ask for and where
#[derive(Debug, Clone)]
pub struct PriceSource {
    pub price_url: String,
    pub coin_id: String,
    pub vs_currency: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl PriceSource {
    pub fn from_config(config: &PollerConfig, user_agent: &str, timeout: Duration) -> Self {
        Self {
            price_url: config.price_url.clone(),
            coin_id: config.coin_id.clone(),
            vs_currency: config.vs_currency.clone(),
            user_agent: user_agent.to_string(),
            timeout,
        }
    }

    /// Builds the request for the current price
    pub fn request(&self) -> Result<FetchRequest> {
        let mut url = Url::parse(&self.price_url)?;
        url.query_pairs_mut()
            .append_pair("ids", &self.coin_id)
            .append_pair("vs_currencies", &self.vs_currency)
            .append_pair("include_last_updated_at", "true");

        Ok(FetchRequest::get(url.to_string())
            .with_header("User-Agent", self.user_agent.as_str())
            .with_timeout(self.timeout))
    }

    /// Decodes a response body into a tick
    ///
    /// `Ok(None)` means the body held no usable (positive) price.
    pub fn decode(&self, body: &str) -> Result<Option<PriceTick>> {
        let value: Value = serde_json::from_str(body).map_err(|source| PulseError::JsonParse {
            url: self.price_url.clone(),
            source,
        })?;

        let coin = &value[self.coin_id.as_str()];
        let Some(price) = coin[self.vs_currency.as_str()].as_f64() else {
            return Ok(None);
        };

        if price <= 0.0 {
            return Ok(None);
        }

        let observed_at = coin["last_updated_at"]
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Some(PriceTick { price, observed_at }))
    }
}
