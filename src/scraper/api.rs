//! Offset-paginated JSON listing API strategy
//!
//! Page descriptors are computed up front: page `i` requests
//! `start = 1 + page_size * i`. Each response envelope holds a nested list of
//! currency entries; an entry is emitted only if it carries a `USD` quote.

use crate::config::{HttpConfig, ScraperConfig};
use crate::fetch::{FetchRequest, ResilientFetcher, DEFAULT_TIMEOUT};
use crate::scraper::record::CoinRecord;
use crate::scraper::strategy::{PageDescriptor, ScrapeContext, ScrapeStrategy};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Quote currency whose figures populate the record
const QUOTE_CURRENCY: &str = "USD";

/// Settings for the API strategy
#[derive(Debug, Clone)]
pub struct ApiStrategyConfig {
    pub api_url: String,
    /// Site the API belongs to; used for `origin` and `referer`
    pub site_url: String,
    pub max_pages: usize,
    pub page_size: usize,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ApiStrategyConfig {
    pub fn from_config(scraper: &ScraperConfig, http: &HttpConfig) -> Self {
        Self {
            api_url: scraper.api_url.clone(),
            site_url: scraper.listing_url.clone(),
            max_pages: scraper.max_pages,
            page_size: scraper.page_size,
            user_agent: http.user_agent.clone(),
            timeout: Duration::from_secs(http.timeout_secs),
        }
    }
}

/// JSON listing API strategy
pub struct ApiStrategy {
    config: ApiStrategyConfig,
    fetcher: ResilientFetcher,
    base_url: Url,
    origin: String,
    referer: String,
}

impl ApiStrategy {
    pub fn new(config: ApiStrategyConfig, fetcher: ResilientFetcher) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)?;
        let origin = Url::parse(&config.site_url)?.origin().ascii_serialization();
        let referer = format!("{}/", origin);

        Ok(Self {
            config,
            fetcher,
            base_url,
            origin,
            referer,
        })
    }

    /// URL of the listing page starting at 1-based offset `start`
    pub fn page_url(&self, start: usize) -> String {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("limit", &self.config.page_size.to_string())
            .append_pair("sortBy", "rank")
            .append_pair("sortType", "desc")
            .append_pair("convert", "USD,BTC,ETH")
            .append_pair("cryptoType", "all")
            .append_pair("tagType", "all")
            .append_pair("audited", "false")
            .append_pair(
                "aux",
                "ath,atl,high24h,low24h,num_market_pairs,cmc_rank,date_added,max_supply,\
                 circulating_supply,total_supply,volume_7d,volume_30d,\
                 self_reported_circulating_supply,self_reported_market_cap",
            );
        url.to_string()
    }

    fn request(&self, url: &str) -> FetchRequest {
        let timeout = if self.config.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.config.timeout
        };

        FetchRequest::get(url)
            .with_header("accept", "application/json, text/plain, */*")
            .with_header("accept-language", "en-US,en;q=0.9")
            .with_header("origin", self.origin.as_str())
            .with_header("referer", self.referer.as_str())
            .with_header("user-agent", self.config.user_agent.as_str())
            .with_timeout(timeout)
    }
}

#[async_trait]
impl ScrapeStrategy for ApiStrategy {
    fn name(&self) -> &str {
        "JSON/API"
    }

    async fn enumerate_pages(&mut self, _ctx: &ScrapeContext<'_>) -> Result<Vec<PageDescriptor>> {
        Ok((0..self.config.max_pages)
            .map(|i| PageDescriptor::new(i, self.page_url(1 + self.config.page_size * i)))
            .collect())
    }

    async fn fetch_page(
        &mut self,
        page: &PageDescriptor,
        ctx: &ScrapeContext<'_>,
    ) -> Result<Option<String>> {
        let request = self.request(&page.location);
        let response = self
            .fetcher
            .fetch(&request, ctx.cancel, Some(ctx.counter))
            .await
            .into_response();

        if response.is_none() {
            tracing::error!("Cannot fetch JSON data from {}", page.location);
        }

        Ok(response.map(|response| response.body))
    }

    fn extract(&self, content: &str) -> Vec<CoinRecord> {
        extract_listing(content)
    }
}

/// Maps a listing envelope to records, dropping entries without a USD quote
///
/// Entries are converted one at a time: a field with an unexpected type is
/// left absent and never costs the rest of the page.
pub fn extract_listing(content: &str) -> Vec<CoinRecord> {
    let envelope: Value = match serde_json::from_str(content) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!("Cannot parse JSON data from API response: {}", e);
            return Vec::new();
        }
    };

    let Some(entries) = envelope["data"]["cryptoCurrencyList"].as_array() else {
        tracing::warn!("API response has no cryptoCurrencyList");
        return Vec::new();
    };

    entries.iter().filter_map(entry_to_record).collect()
}

fn entry_to_record(entry: &Value) -> Option<CoinRecord> {
    let symbol = text_field(entry, "symbol");

    let Some(quote) = entry["quotes"].as_array().and_then(|quotes| {
        quotes
            .iter()
            .find(|quote| quote["name"].as_str() == Some(QUOTE_CURRENCY))
    }) else {
        tracing::debug!(
            "Skipping {} without a {} quote",
            symbol.as_deref().unwrap_or("<unknown>"),
            QUOTE_CURRENCY
        );
        return None;
    };

    Some(CoinRecord {
        rank: entry["cmcRank"]
            .as_u64()
            .and_then(|rank| u32::try_from(rank).ok())
            .filter(|rank| *rank >= 1),
        name: text_field(entry, "name"),
        symbol,
        price: quote["price"].as_f64(),
        change_24h: quote["percentChange24h"].as_f64(),
        market_cap: quote["marketCap"].as_f64(),
    })
}

/// Non-empty string field, trimmed
fn text_field(value: &Value, key: &str) -> Option<String> {
    value[key]
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fetch::{HttpTransport, RetryPolicy};
    use std::sync::Arc;

    fn strategy(max_pages: usize) -> ApiStrategy {
        let mut config = Config::default();
        config.scraper.max_pages = max_pages;
        let fetcher = ResilientFetcher::new(
            Arc::new(HttpTransport::from_config(&config.http).unwrap()),
            RetryPolicy::default(),
        );
        ApiStrategy::new(
            ApiStrategyConfig::from_config(&config.scraper, &config.http),
            fetcher,
        )
        .unwrap()
    }

    fn start_param(location: &str) -> String {
        Url::parse(location)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "start")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_page_offsets() {
        let mut strategy = strategy(3);
        let counter = crate::fetch::AtomicRequestCounter::new();
        let cancel = crate::state::CancellationToken::new();
        let ctx = ScrapeContext {
            cancel: &cancel,
            counter: &counter,
        };

        let pages = strategy.enumerate_pages(&ctx).await.unwrap();

        assert_eq!(pages.len(), 3);
        let starts: Vec<_> = pages.iter().map(|p| start_param(&p.location)).collect();
        assert_eq!(starts, vec!["1", "101", "201"]);
        assert_eq!(pages[2].index, 2);
        // Enumeration does no network work
        assert_eq!(crate::fetch::RequestCounter::count(&counter), 0);
    }

    #[test]
    fn test_page_url_query() {
        let url = Url::parse(&strategy(1).page_url(101)).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(query["start"], "101");
        assert_eq!(query["limit"], "100");
        assert_eq!(query["sortBy"], "rank");
        assert_eq!(query["sortType"], "desc");
        assert_eq!(query["convert"], "USD,BTC,ETH");
        assert!(query["aux"].starts_with("ath,atl"));
    }

    #[test]
    fn test_request_headers() {
        let strategy = strategy(1);
        let request = strategy.request("https://api.example.com/listing");

        let header = |name: &str| {
            request
                .headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(header("origin").as_deref(), Some("https://coinmarketcap.com"));
        assert_eq!(header("referer").as_deref(), Some("https://coinmarketcap.com/"));
        assert!(header("accept").unwrap().contains("application/json"));
        assert!(header("user-agent").unwrap().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_extract_usd_quotes() {
        let body = r#"{
            "data": {
                "cryptoCurrencyList": [
                    {
                        "cmcRank": 1, "name": "Bitcoin", "symbol": "BTC",
                        "quotes": [
                            {"name": "BTC", "price": 1.0},
                            {"name": "USD", "price": 64012.5, "percentChange24h": -1.2, "marketCap": 1.26e12}
                        ]
                    },
                    {
                        "cmcRank": 2, "name": "Ethereum", "symbol": "ETH",
                        "quotes": [{"name": "USD", "price": 3100.25, "percentChange24h": 0.8, "marketCap": 3.7e11}]
                    }
                ]
            }
        }"#;

        let records = extract_listing(body);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rank, Some(1));
        assert_eq!(records[0].symbol.as_deref(), Some("BTC"));
        assert_eq!(records[0].price, Some(64012.5));
        assert_eq!(records[0].change_24h, Some(-1.2));
        assert_eq!(records[0].market_cap, Some(1.26e12));
        assert_eq!(records[1].name.as_deref(), Some("Ethereum"));
    }

    #[test]
    fn test_entry_without_usd_quote_is_dropped() {
        let body = r#"{"data": {"cryptoCurrencyList": [
            {"cmcRank": 1, "name": "Bitcoin", "symbol": "BTC", "quotes": [{"name": "ETH", "price": 20.0}]},
            {"cmcRank": 2, "name": "NoQuotes", "symbol": "NQ"},
            {"cmcRank": 3, "name": "Tether", "symbol": "USDT", "quotes": [{"name": "USD", "price": 1.0}]}
        ]}}"#;

        let records = extract_listing(body);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol.as_deref(), Some("USDT"));
        assert_eq!(records[0].change_24h, None);
    }

    #[test]
    fn test_malformed_entry_keeps_its_neighbours() {
        let body = r#"{"data": {"cryptoCurrencyList": [
            {"cmcRank": 1, "name": "Bitcoin", "symbol": "BTC",
             "quotes": [{"name": "USD", "price": 64012.5, "marketCap": 1.26e12}]},
            {"cmcRank": "first", "name": 42, "symbol": "ODD",
             "quotes": [{"name": "USD", "price": 0.5, "marketCap": "N/A"}]},
            {"cmcRank": 3, "name": "Tether", "symbol": "USDT",
             "quotes": [{"name": "USD", "price": 1.0}]}
        ]}}"#;

        let records = extract_listing(body);

        let symbols: Vec<_> = records.iter().map(|r| r.symbol.as_deref()).collect();
        assert_eq!(symbols, vec![Some("BTC"), Some("ODD"), Some("USDT")]);
        assert_eq!(records[1].rank, None);
        assert_eq!(records[1].name, None);
        assert_eq!(records[1].price, Some(0.5));
        assert_eq!(records[1].market_cap, None);
        assert_eq!(records[2].rank, Some(3));
    }

    #[test]
    fn test_rank_zero_is_absent() {
        let body = r#"{"data": {"cryptoCurrencyList": [
            {"cmcRank": 0, "name": "Unranked", "symbol": "UNR", "quotes": [{"name": "USD", "price": 2.0}]}
        ]}}"#;

        let records = extract_listing(body);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rank, None);
        assert_eq!(records[0].price, Some(2.0));
    }

    #[test]
    fn test_malformed_or_empty_envelope() {
        assert!(extract_listing("not json").is_empty());
        assert!(extract_listing("{}").is_empty());
        assert!(extract_listing(r#"{"data": {}}"#).is_empty());
    }
}
