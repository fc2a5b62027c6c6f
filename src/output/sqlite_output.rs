//! SQLite record sink

use crate::output::schema::initialize_schema;
use crate::output::traits::{OutputResult, RecordSink};
use crate::scraper::CoinRecord;
use rusqlite::{params, Connection};
use std::path::Path;

/// Appends records to the `watchlist` table
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens (or creates) the database file and its table
    pub fn new(path: &Path) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of rows currently stored
    pub fn count(&self) -> OutputResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM watchlist", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RecordSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write(&mut self, records: &[CoinRecord]) -> OutputResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO watchlist (rank, name, symbol, price, change_24h, market_cap)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.rank,
                    record.name,
                    record.symbol,
                    record.price,
                    record.change_24h,
                    record.market_cap,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!("Saved {} records to SQLite", records.len());
        Ok(())
    }
}
