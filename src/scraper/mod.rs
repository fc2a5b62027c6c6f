//! Scraper module for listing-page collection
//!
//! This module contains:
//! - The normalized [`CoinRecord`] and field parsers
//! - The [`ScrapeStrategy`] capability set and its two variants
//!   (browser-driven table, offset-paginated JSON API)
//! - The [`ScraperOrchestrator`] that drives a strategy into a [`ScrapeRun`]

mod api;
mod browser;
mod orchestrator;
mod record;
mod strategy;
mod table;

pub use api::{extract_listing, ApiStrategy, ApiStrategyConfig};
pub use browser::{TableStrategy, TableStrategyConfig};
pub use orchestrator::{Measurement, RunOptions, ScrapeRun, ScraperOrchestrator};
pub use record::{parse_numeric, parse_rank, CoinRecord, FieldParseError};
pub use strategy::{PageDescriptor, ScrapeContext, ScrapeStrategy};
pub use table::{TableParser, TableSelectors};
