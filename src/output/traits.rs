//! Record sink trait and error types

use crate::scraper::CoinRecord;
use thiserror::Error;

/// Errors that can occur while writing records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A destination for scraped records
///
/// Sinks derive their own layout from [`CoinRecord::FIELDS`]; writing an
/// empty slice does nothing.
pub trait RecordSink {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Writes every record in order
    fn write(&mut self, records: &[CoinRecord]) -> OutputResult<()>;
}
