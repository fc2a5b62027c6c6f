//! Output module for persisting scraped records
//!
//! This module handles:
//! - The [`RecordSink`] interface shared by every destination
//! - CSV files with a header row
//! - The SQLite `watchlist` table

mod csv_output;
mod schema;
mod sqlite_output;
mod traits;

pub use csv_output::CsvSink;
pub use schema::{initialize_schema, SCHEMA_SQL, TABLE_NAME};
pub use sqlite_output::SqliteSink;
pub use traits::{OutputError, OutputResult, RecordSink};

use crate::scraper::CoinRecord;

/// Forwards records to every sink
///
/// A failing sink is logged and does not stop the others. Returns the number
/// of sinks that succeeded.
pub fn write_to_sinks(sinks: &mut [Box<dyn RecordSink>], records: &[CoinRecord]) -> usize {
    let mut written = 0;

    for sink in sinks.iter_mut() {
        match sink.write(records) {
            Ok(()) => written += 1,
            Err(e) => tracing::error!("Failed to write records to {}: {}", sink.name(), e),
        }
    }

    written
}
