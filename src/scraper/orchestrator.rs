//! Scrape orchestrator - drives a strategy over its listing pages
//!
//! This module contains the main scrape loop, which:
//! - Enumerates listing pages through the strategy
//! - Fetches and extracts each page in order
//! - Skips pages that yield no records
//! - Stops paginating on an unrecoverable page error, keeping collected records
//! - Counts requests and optionally times the run
//! - Releases the strategy's session on every exit path

use crate::fetch::{AtomicRequestCounter, RequestCounter};
use crate::scraper::record::CoinRecord;
use crate::scraper::strategy::{PageDescriptor, ScrapeContext, ScrapeStrategy};
use crate::state::CancellationToken;
use std::collections::VecDeque;
use std::time::Instant;

/// Options for a single orchestrator run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Time the run and report request throughput
    pub measure_performance: bool,
}

/// Request count and wall-clock time of a measured run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub request_count: u64,
    pub elapsed_seconds: f64,
}

impl Measurement {
    /// Requests per second, or 0 when no time elapsed
    pub fn throughput(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.request_count as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

/// Result of one orchestrator invocation
#[derive(Debug, Clone, Default)]
pub struct ScrapeRun {
    /// Records in page-then-row order
    pub records: Vec<CoinRecord>,
    /// Network round trips attributable to the run
    pub request_count: u64,
    /// Present only when the run was measured
    pub elapsed_seconds: Option<f64>,
}

impl ScrapeRun {
    /// Measurement-mode output: `(request_count, elapsed)` instead of records
    pub fn measurement(&self) -> Option<Measurement> {
        self.elapsed_seconds.map(|elapsed_seconds| Measurement {
            request_count: self.request_count,
            elapsed_seconds,
        })
    }
}

/// Drives a [`ScrapeStrategy`] and aggregates its records
#[derive(Debug, Clone)]
pub struct ScraperOrchestrator {
    cancel: CancellationToken,
}

impl ScraperOrchestrator {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Runs `strategy` to completion
    ///
    /// Never fails: enumeration errors yield an empty run, page errors end
    /// pagination early, and the records collected so far are returned.
    pub async fn run(&self, strategy: &mut dyn ScrapeStrategy, options: RunOptions) -> ScrapeRun {
        let counter = AtomicRequestCounter::new();
        let start_time = options.measure_performance.then(Instant::now);

        tracing::info!("Starting {} scraper...", strategy.name());

        let ctx = ScrapeContext {
            cancel: &self.cancel,
            counter: &counter,
        };
        let records = self.collect(strategy, &ctx).await;

        strategy.close().await;

        if records.is_empty() {
            tracing::info!("{} scraper returned no results", strategy.name());
        } else {
            tracing::info!(
                "{} scraper found {} coins",
                strategy.name(),
                records.len()
            );
        }

        let request_count = counter.count();
        let elapsed_seconds = start_time.map(|started| started.elapsed().as_secs_f64());

        if let Some(elapsed) = elapsed_seconds {
            tracing::info!(
                "Scraper completed. Total requests made: {}. Time taken: {:.2} seconds.",
                request_count,
                elapsed
            );
        }

        ScrapeRun {
            records,
            request_count,
            elapsed_seconds,
        }
    }

    async fn collect(
        &self,
        strategy: &mut dyn ScrapeStrategy,
        ctx: &ScrapeContext<'_>,
    ) -> Vec<CoinRecord> {
        let mut records = Vec::new();

        let mut queue: VecDeque<PageDescriptor> = match strategy.enumerate_pages(ctx).await {
            Ok(pages) => pages.into(),
            Err(e) => {
                tracing::error!("Failed to enumerate listing pages: {}", e);
                return records;
            }
        };

        if queue.is_empty() {
            tracing::warn!("No listing pages to scrape");
        }

        while let Some(page) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping before page {}", page.index);
                break;
            }

            tracing::debug!("Scraping listing page {} ({})", page.index, page.location);

            match strategy.fetch_page(&page, ctx).await {
                Ok(Some(content)) => {
                    let page_records = strategy.extract(&content);
                    if page_records.is_empty() {
                        tracing::debug!("Listing page {} yielded no records", page.index);
                    } else {
                        tracing::debug!(
                            "Listing page {} yielded {} records",
                            page.index,
                            page_records.len()
                        );
                        records.extend(page_records);
                    }
                }
                Ok(None) => {
                    tracing::warn!("No data for listing page {} ({})", page.index, page.location);
                }
                Err(e) => {
                    tracing::error!("Error scraping {}: {}", page.location, e);
                    break;
                }
            }

            if queue.is_empty() && !self.cancel.is_cancelled() {
                match strategy.advance(&page, ctx).await {
                    Ok(Some(next)) => queue.push_back(next),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Stopping pagination: {}", e);
                        break;
                    }
                }
            }
        }

        records
    }
}
