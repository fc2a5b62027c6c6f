//! Table definition for persisted records

/// Name of the records table
pub const TABLE_NAME: &str = "watchlist";

/// SQL schema for the records table
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS watchlist (
    rank INTEGER,
    name TEXT,
    symbol TEXT,
    price REAL,
    change_24h REAL,
    market_cap REAL
);
"#;

/// Creates the records table if it does not exist
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
