//! Normalized coin record shared by every scrape strategy and sink

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One coin row from a listing page
///
/// Any field may be absent when it was not found or could not be parsed;
/// the record is still emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub rank: Option<u32>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub price: Option<f64>,
    pub change_24h: Option<f64>,
    pub market_cap: Option<f64>,
}

impl CoinRecord {
    /// Field names in output order
    pub const FIELDS: [&'static str; 6] =
        ["rank", "name", "symbol", "price", "change_24h", "market_cap"];

    /// Returns true if every field is absent
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Errors converting scraped text into numeric fields
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldParseError {
    #[error("no numeric characters in '{0}'")]
    Empty(String),

    #[error("invalid number '{0}'")]
    Invalid(String),
}

/// Parses a display number such as `$1,234.56`, `-2.5%` or `$1.2T`
///
/// Every character other than digits, `.` and `-` is removed first.
///
/// # Example
///
/// ```
/// use coin_pulse::scraper::parse_numeric;
///
/// assert_eq!(parse_numeric("$64,012.50"), Ok(64012.5));
/// assert_eq!(parse_numeric("-1.25%"), Ok(-1.25));
/// ```
pub fn parse_numeric(text: &str) -> Result<f64, FieldParseError> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return Err(FieldParseError::Empty(text.to_string()));
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| FieldParseError::Invalid(text.to_string()))
}

/// Parses a listing rank; ranks start at 1
pub fn parse_rank(text: &str) -> Result<u32, FieldParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FieldParseError::Empty(text.to_string()));
    }

    match trimmed.parse::<u32>() {
        Ok(rank) if rank >= 1 => Ok(rank),
        _ => Err(FieldParseError::Invalid(text.to_string())),
    }
}
