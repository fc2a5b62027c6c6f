//! Integration tests for the fetch, scrape and poll pipelines
//!
//! These tests use wiremock to stand in for the listing API and the price
//! endpoint, and run each pipeline end-to-end against it.

use coin_pulse::config::Config;
use coin_pulse::fetch::{
    AtomicRequestCounter, FetchOutcome, FetchRequest, HttpTransport, RequestCounter,
    ResilientFetcher, RetryPolicy,
};
use coin_pulse::output::{write_to_sinks, CsvSink, RecordSink, SqliteSink};
use coin_pulse::poller::{PollSettings, PricePoller, PriceSource};
use coin_pulse::scraper::{ApiStrategy, ApiStrategyConfig, RunOptions, ScraperOrchestrator};
use coin_pulse::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fetcher with a short backoff so retries finish quickly
fn create_test_fetcher(config: &Config, max_attempts: u32) -> ResilientFetcher {
    let transport = HttpTransport::from_config(&config.http).expect("Failed to build client");
    ResilientFetcher::new(
        Arc::new(transport),
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(10),
        },
    )
}

/// Creates a configuration pointing the listing API at the mock server
fn create_test_config(base_url: &str, max_pages: usize, page_size: usize) -> Config {
    let mut config = Config::default();
    config.http.user_agent = "TestAgent/1.0".to_string();
    config.scraper.listing_url = base_url.to_string();
    config.scraper.api_url = format!("{}/listing", base_url);
    config.scraper.max_pages = max_pages;
    config.scraper.page_size = page_size;
    config.poller.price_url = format!("{}/simple/price", base_url);
    config
}

/// Listing envelope with one USD-quoted entry per `(rank, symbol, price)`
fn listing_body(entries: &[(u32, &str, f64)]) -> String {
    let list: Vec<String> = entries
        .iter()
        .map(|(rank, symbol, price)| {
            format!(
                r#"{{"cmcRank": {rank}, "name": "{symbol} coin", "symbol": "{symbol}",
                    "quotes": [{{"name": "USD", "price": {price}, "percentChange24h": 1.5, "marketCap": 1000000.0}}]}}"#
            )
        })
        .collect();
    format!(r#"{{"data": {{"cryptoCurrencyList": [{}]}}}}"#, list.join(","))
}

async fn mount_listing_page(server: &MockServer, start: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/listing"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetcher_recovers_after_server_errors() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), 1, 100);

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let fetcher = create_test_fetcher(&config, 5);
    let counter = AtomicRequestCounter::new();
    let request = FetchRequest::get(format!("{}/flaky", mock_server.uri()));

    let outcome = fetcher
        .fetch(&request, &CancellationToken::new(), Some(&counter))
        .await;

    match outcome {
        FetchOutcome::Success(response) => {
            assert_eq!(response.status, 200);
            assert_eq!(response.body, "ok");
        }
        other => panic!("Expected success, got {:?}", other),
    }

    // Only the successful exchange is counted
    assert_eq!(counter.count(), 1);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_fetcher_gives_up_after_max_attempts() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), 1, 100);

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let fetcher = create_test_fetcher(&config, 3);
    let counter = AtomicRequestCounter::new();
    let request = FetchRequest::get(format!("{}/down", mock_server.uri()));

    let outcome = fetcher
        .fetch(&request, &CancellationToken::new(), Some(&counter))
        .await;

    assert!(matches!(outcome, FetchOutcome::Exhausted { attempts: 3, .. }));
    assert_eq!(counter.count(), 0);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_api_scrape_collects_every_page() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), 2, 2);

    mount_listing_page(
        &mock_server,
        "1",
        listing_body(&[(1, "BTC", 64000.0), (2, "ETH", 3100.0)]),
    )
    .await;
    mount_listing_page(
        &mock_server,
        "3",
        listing_body(&[(3, "USDT", 1.0), (4, "BNB", 580.0)]),
    )
    .await;

    let mut strategy = ApiStrategy::new(
        ApiStrategyConfig::from_config(&config.scraper, &config.http),
        create_test_fetcher(&config, 2),
    )
    .expect("Failed to create strategy");
    let orchestrator = ScraperOrchestrator::new(CancellationToken::new());

    let run = orchestrator.run(&mut strategy, RunOptions::default()).await;

    let symbols: Vec<_> = run
        .records
        .iter()
        .map(|r| r.symbol.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(symbols, vec!["BTC", "ETH", "USDT", "BNB"]);
    assert_eq!(run.records[0].price, Some(64000.0));
    assert_eq!(run.request_count, 2);
    assert!(run.measurement().is_none());
}

#[tokio::test]
async fn test_api_scrape_keeps_records_when_page_fails() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), 3, 2);

    mount_listing_page(
        &mock_server,
        "1",
        listing_body(&[(1, "BTC", 64000.0), (2, "ETH", 3100.0)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/listing"))
        .and(query_param("start", "3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_listing_page(&mock_server, "5", listing_body(&[(5, "SOL", 150.0)])).await;

    let mut strategy = ApiStrategy::new(
        ApiStrategyConfig::from_config(&config.scraper, &config.http),
        create_test_fetcher(&config, 2),
    )
    .expect("Failed to create strategy");
    let orchestrator = ScraperOrchestrator::new(CancellationToken::new());

    let run = orchestrator
        .run(
            &mut strategy,
            RunOptions {
                measure_performance: true,
            },
        )
        .await;

    // The failed page is skipped and later pages are still collected
    assert_eq!(run.records.len(), 3);
    let measurement = run.measurement().expect("Run should be measured");
    assert_eq!(measurement.request_count, 2);
    assert!(measurement.elapsed_seconds > 0.0);
}

#[tokio::test]
async fn test_api_scrape_drops_entries_without_usd_quote() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), 1, 100);

    let body = r#"{"data": {"cryptoCurrencyList": [
        {"cmcRank": 1, "name": "Bitcoin", "symbol": "BTC", "quotes": [{"name": "USD", "price": 64000.0}]},
        {"cmcRank": 2, "name": "Wrapped", "symbol": "WBTC", "quotes": [{"name": "BTC", "price": 1.0}]}
    ]}}"#;
    mount_listing_page(&mock_server, "1", body.to_string()).await;

    let mut strategy = ApiStrategy::new(
        ApiStrategyConfig::from_config(&config.scraper, &config.http),
        create_test_fetcher(&config, 1),
    )
    .expect("Failed to create strategy");

    let run = ScraperOrchestrator::new(CancellationToken::new())
        .run(&mut strategy, RunOptions::default())
        .await;

    assert_eq!(run.records.len(), 1);
    assert_eq!(run.records[0].symbol.as_deref(), Some("BTC"));
}

#[tokio::test]
async fn test_scraped_records_reach_every_sink() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&mock_server.uri(), 1, 100);
    config.output.csv_path = temp_dir.path().join("watchlist.csv").display().to_string();
    config.output.sqlite_path = temp_dir.path().join("watchlist.db").display().to_string();

    mount_listing_page(
        &mock_server,
        "1",
        listing_body(&[(1, "BTC", 64000.0), (2, "ETH", 3100.0)]),
    )
    .await;

    let mut strategy = ApiStrategy::new(
        ApiStrategyConfig::from_config(&config.scraper, &config.http),
        create_test_fetcher(&config, 1),
    )
    .expect("Failed to create strategy");
    let run = ScraperOrchestrator::new(CancellationToken::new())
        .run(&mut strategy, RunOptions::default())
        .await;

    let mut sinks: Vec<Box<dyn RecordSink>> = vec![
        Box::new(CsvSink::new(&config.output.csv_path)),
        Box::new(
            SqliteSink::new(std::path::Path::new(&config.output.sqlite_path))
                .expect("Failed to open database"),
        ),
    ];
    assert_eq!(write_to_sinks(&mut sinks, &run.records), 2);

    let csv = std::fs::read_to_string(&config.output.csv_path).expect("CSV not written");
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.starts_with("rank,name,symbol,price,change_24h,market_cap"));

    let database = SqliteSink::new(std::path::Path::new(&config.output.sqlite_path))
        .expect("Failed to reopen database");
    assert_eq!(database.count().unwrap(), 2);
}

#[tokio::test]
async fn test_poller_collects_prices_from_endpoint() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), 1, 100);

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "bitcoin"))
        .and(query_param("vs_currencies", "usd"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"bitcoin": {"usd": 64000.0, "last_updated_at": 1718000000}}"#),
        )
        .mount(&mock_server)
        .await;

    let source = PriceSource::from_config(
        &config.poller,
        &config.http.user_agent,
        Duration::from_secs(5),
    );
    let poller = PricePoller::new(
        create_test_fetcher(&config, 1),
        source,
        CancellationToken::new(),
    );
    let settings = PollSettings {
        interval: Duration::from_millis(10),
        amount: 3,
        sma_period: 2,
    };

    let mut averages = Vec::new();
    let prices = poller
        .poll(settings, |observation| averages.push(observation.average))
        .await;

    assert_eq!(prices, vec![64000.0; 3]);
    assert_eq!(averages, vec![None, Some(64000.0), Some(64000.0)]);
}

#[tokio::test]
async fn test_poller_stops_when_cancelled() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), 1, 100);

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"bitcoin": {"usd": 1.0}}"#))
        .mount(&mock_server)
        .await;

    let cancel = CancellationToken::new();
    let source = PriceSource::from_config(
        &config.poller,
        &config.http.user_agent,
        Duration::from_secs(5),
    );
    let poller = PricePoller::new(create_test_fetcher(&config, 1), source, cancel.clone());
    let settings = PollSettings {
        interval: Duration::from_secs(60),
        amount: 100,
        sma_period: 10,
    };

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let prices = tokio::time::timeout(Duration::from_secs(10), poller.poll(settings, |_| {}))
        .await
        .expect("Poller did not observe cancellation");
    canceller.await.unwrap();

    assert_eq!(prices, vec![1.0]);
}
