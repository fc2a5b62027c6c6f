//! Coin-Pulse main entry point
//!
//! This is the command-line interface for the Coin-Pulse market data collector.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use coin_pulse::config::{load_config_with_hash, validate, Config};
use coin_pulse::fetch::{HttpTransport, ResilientFetcher, RetryPolicy};
use coin_pulse::output::{write_to_sinks, CsvSink, RecordSink, SqliteSink};
use coin_pulse::poller::{PollSettings, PriceObservation, PricePoller, PriceSource};
use coin_pulse::scraper::{
    ApiStrategy, ApiStrategyConfig, CoinRecord, Measurement, RunOptions, ScrapeStrategy,
    ScraperOrchestrator, TableStrategy, TableStrategyConfig,
};
use coin_pulse::CancellationToken;
use comfy_table::{presets::UTF8_FULL, Table};
use num_format::{Locale, ToFormattedString};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Coin-Pulse: resilient cryptocurrency market data collection
///
/// Polls a live price feed with a moving average, or scrapes coin listings
/// from a paginated web table or a JSON listing API.
#[derive(Parser, Debug)]
#[command(name = "coin-pulse")]
#[command(version = "1.0.0")]
#[command(about = "Resilient cryptocurrency market data collection", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Log level for coin-pulse messages
    #[arg(
        long,
        global = true,
        default_value = "error",
        ignore_case = true,
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the live price and print a moving average
    Poll {
        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,

        /// Number of prices to collect
        #[arg(long)]
        amount: Option<usize>,

        /// Moving average window
        #[arg(long)]
        sma_period: Option<usize>,
    },

    /// Scrape the coin listing
    Scrape {
        /// Listing source
        #[arg(long, value_enum, default_value_t = Mode::Html)]
        mode: Mode,

        /// Number of listing pages to collect
        #[arg(long)]
        max_pages: Option<usize>,

        /// Save records to the CSV file
        #[arg(long)]
        save_csv: bool,

        /// Save records to the SQLite database
        #[arg(long)]
        save_sqlite: bool,

        /// Report requests, time and throughput instead of records
        #[arg(long)]
        measure_performance: bool,
    },

    /// Measure both listing sources back to back
    Compare {
        /// Number of listing pages to collect per source
        #[arg(long)]
        max_pages: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Browser-driven paginated table
    Html,
    /// Offset-paginated JSON API
    Api,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(&cli.log_level, cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli.command);
    validate(&config).context("invalid configuration")?;

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let transport = Arc::new(HttpTransport::from_config(&config.http)?);
    let fetcher = ResilientFetcher::new(transport, RetryPolicy::from_config(&config.retry));

    match cli.command {
        Command::Poll { .. } => handle_poll(&config, fetcher, cancel).await,
        Command::Scrape {
            mode,
            save_csv,
            save_sqlite,
            measure_performance,
            ..
        } => {
            let sinks = SinkSelection {
                csv: save_csv,
                sqlite: save_sqlite,
            };
            handle_scrape(&config, fetcher, cancel, mode, sinks, measure_performance).await
        }
        Command::Compare { .. } => handle_compare(&config, fetcher, cancel).await,
    }
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` takes precedence over the command-line flags.
fn setup_logging(log_level: &str, verbose: u8, quiet: bool) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => log_level.to_ascii_lowercase(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("error,coin_pulse={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Layers command-line values over the loaded configuration
fn apply_overrides(config: &mut Config, command: &Command) {
    match command {
        Command::Poll {
            interval,
            amount,
            sma_period,
        } => {
            if let Some(interval) = interval {
                config.poller.interval_secs = *interval;
            }
            if let Some(amount) = amount {
                config.poller.amount = *amount;
            }
            if let Some(sma_period) = sma_period {
                config.poller.sma_period = *sma_period;
            }
        }
        Command::Scrape { max_pages, .. } | Command::Compare { max_pages } => {
            if let Some(max_pages) = max_pages {
                config.scraper.max_pages = *max_pages;
            }
        }
    }
}

/// Cancels the shared token on Ctrl-C; a second Ctrl-C exits immediately
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(shutdown_on_signals(tokio::signal::ctrl_c, cancel, || {
        // 130 is the conventional exit code for SIGINT
        std::process::exit(130)
    }));
}

/// Cancels on the first signal and calls `force_exit` on the second
async fn shutdown_on_signals<S, Fut, F>(
    mut next_signal: S,
    cancel: CancellationToken,
    force_exit: F,
) where
    S: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
    F: FnOnce(),
{
    if let Err(e) = next_signal().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    println!("Shutting down...");
    cancel.cancel();

    if next_signal().await.is_ok() {
        eprintln!("Second Ctrl-C received, exiting now");
        force_exit();
    }
}

async fn handle_poll(
    config: &Config,
    fetcher: ResilientFetcher,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let source = PriceSource::from_config(
        &config.poller,
        &config.http.user_agent,
        Duration::from_secs(config.http.timeout_secs),
    );
    let settings = PollSettings::from_config(&config.poller);
    let ticker = ticker_label(&config.poller.coin_id);
    let currency = config.poller.vs_currency.to_ascii_uppercase();

    let poller = PricePoller::new(fetcher, source, cancel);
    let prices = poller
        .poll(settings, |observation| {
            println!(
                "{}",
                format_observation(observation, &ticker, &currency, settings.sma_period)
            );
        })
        .await;

    tracing::info!("Collected {} prices", prices.len());
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct SinkSelection {
    csv: bool,
    sqlite: bool,
}

async fn handle_scrape(
    config: &Config,
    fetcher: ResilientFetcher,
    cancel: CancellationToken,
    mode: Mode,
    selection: SinkSelection,
    measure_performance: bool,
) -> anyhow::Result<()> {
    let mut strategy = build_strategy(mode, config, fetcher)?;
    let orchestrator = ScraperOrchestrator::new(cancel);
    let run = orchestrator
        .run(strategy.as_mut(), RunOptions { measure_performance })
        .await;

    if let Some(measurement) = run.measurement() {
        print_measurement(strategy.name(), &measurement);
        return Ok(());
    }

    println!("Collected {} records", run.records.len());

    let mut sinks = open_sinks(config, selection);
    if sinks.is_empty() {
        if !run.records.is_empty() {
            println!("{}", records_table(&run.records));
        }
    } else {
        write_to_sinks(&mut sinks, &run.records);
    }

    Ok(())
}

async fn handle_compare(
    config: &Config,
    fetcher: ResilientFetcher,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let orchestrator = ScraperOrchestrator::new(cancel.clone());

    for mode in [Mode::Html, Mode::Api] {
        if cancel.is_cancelled() {
            break;
        }

        let mut strategy = match build_strategy(mode, config, fetcher.clone()) {
            Ok(strategy) => strategy,
            Err(e) => {
                eprintln!("{:?} strategy unavailable: {}", mode, e);
                continue;
            }
        };

        let run = orchestrator
            .run(
                strategy.as_mut(),
                RunOptions {
                    measure_performance: true,
                },
            )
            .await;

        if let Some(measurement) = run.measurement() {
            print_measurement(strategy.name(), &measurement);
        }
    }

    Ok(())
}

fn build_strategy(
    mode: Mode,
    config: &Config,
    fetcher: ResilientFetcher,
) -> coin_pulse::Result<Box<dyn ScrapeStrategy>> {
    Ok(match mode {
        Mode::Html => Box::new(TableStrategy::new(TableStrategyConfig::from_config(
            &config.scraper,
            &config.http,
        ))?),
        Mode::Api => Box::new(ApiStrategy::new(
            ApiStrategyConfig::from_config(&config.scraper, &config.http),
            fetcher,
        )?),
    })
}

/// Opens the selected sinks; a sink that cannot be opened is logged and skipped
fn open_sinks(config: &Config, selection: SinkSelection) -> Vec<Box<dyn RecordSink>> {
    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::new();

    if selection.csv {
        sinks.push(Box::new(CsvSink::new(&config.output.csv_path)));
    }

    if selection.sqlite {
        match SqliteSink::new(Path::new(&config.output.sqlite_path)) {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(e) => tracing::error!(
                "Cannot open SQLite database {}: {}",
                config.output.sqlite_path,
                e
            ),
        }
    }

    sinks
}

fn print_measurement(name: &str, measurement: &Measurement) {
    println!("{} performance:", name);
    println!("  Requests:   {}", measurement.request_count);
    println!("  Time:       {:.2} s", measurement.elapsed_seconds);
    println!("  Throughput: {:.2} requests/s", measurement.throughput());
}

fn format_observation(
    observation: &PriceObservation,
    ticker: &str,
    currency: &str,
    sma_period: usize,
) -> String {
    let average = observation
        .average
        .map(|sma| format!("${}", format_money(sma)))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "[{}] {} → {}: ${} SMA({}): {}",
        observation.observed_at.format("%Y-%m-%dT%H:%M:%S"),
        ticker,
        currency,
        format_money(observation.price),
        sma_period,
        average
    )
}

fn records_table(records: &[CoinRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(["Rank", "Name", "Symbol", "Price", "24h %", "Market Cap"]);

    for record in records {
        table.add_row([
            record
                .rank
                .map(|rank| rank.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record.name.clone().unwrap_or_else(|| "-".to_string()),
            record.symbol.clone().unwrap_or_else(|| "-".to_string()),
            record
                .price
                .map(|price| format!("${}", format_money(price)))
                .unwrap_or_else(|| "-".to_string()),
            record
                .change_24h
                .map(|change| format!("{:.2}%", change))
                .unwrap_or_else(|| "-".to_string()),
            record
                .market_cap
                .map(|cap| format!("${}", format_money(cap)))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    table
}

fn ticker_label(coin_id: &str) -> String {
    match coin_id {
        "bitcoin" => "BTC".to_string(),
        "ethereum" => "ETH".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

/// Two decimals with thousands separators
fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };

    format!(
        "{}{}.{:02}",
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}
