//! CSV record sink

use crate::output::traits::{OutputResult, RecordSink};
use crate::scraper::CoinRecord;
use std::path::{Path, PathBuf};

/// Writes records to a CSV file with a header row
///
/// Each non-empty write replaces the file. Absent fields become empty cells.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn write(&mut self, records: &[CoinRecord]) -> OutputResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Header comes from the serialized field names
        let mut writer = csv::Writer::from_path(&self.path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        tracing::info!(
            "Saved {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}
