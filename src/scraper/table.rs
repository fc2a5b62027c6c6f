//! Coin table parser for rendered listing pages
//!
//! Each table row maps to one [`CoinRecord`] through a fixed set of named
//! field selectors. A selector miss leaves the field absent; a numeric field
//! whose text holds no number is logged and left absent. The row is always
//! emitted.

use crate::scraper::record::{parse_numeric, parse_rank, CoinRecord};
use crate::{PulseError, Result};
use scraper::{ElementRef, Html, Selector};

/// CSS selectors locating the coin table and its fields
#[derive(Debug, Clone)]
pub struct TableSelectors {
    pub table: String,
    pub row: String,
    pub rank: String,
    pub name: String,
    pub symbol: String,
    pub price: String,
    pub change_24h: String,
    pub market_cap: String,
}

impl Default for TableSelectors {
    fn default() -> Self {
        Self {
            table: "table.cmc-table > tbody".to_string(),
            row: "tr".to_string(),
            rank: "td:nth-child(2)".to_string(),
            name: "p[class*='coin-item-name']".to_string(),
            symbol: "p[class*='coin-item-symbol']".to_string(),
            price: "td:nth-child(4) * > span".to_string(),
            change_24h: "td:nth-child(6)".to_string(),
            market_cap: "td:nth-child(8) * > span[data-nosnippet]".to_string(),
        }
    }
}

/// Compiled form of [`TableSelectors`]
#[derive(Debug, Clone)]
pub struct TableParser {
    table: Selector,
    row: Selector,
    rank: Selector,
    name: Selector,
    symbol: Selector,
    price: Selector,
    change_24h: Selector,
    market_cap: Selector,
}

impl TableParser {
    pub fn new(selectors: &TableSelectors) -> Result<Self> {
        Ok(Self {
            table: compile(&selectors.table)?,
            row: compile(&selectors.row)?,
            rank: compile(&selectors.rank)?,
            name: compile(&selectors.name)?,
            symbol: compile(&selectors.symbol)?,
            price: compile(&selectors.price)?,
            change_24h: compile(&selectors.change_24h)?,
            market_cap: compile(&selectors.market_cap)?,
        })
    }

    /// Parses every row of the first coin table in `html`
    ///
    /// Returns an empty list when the table is not present.
    ///
    /// # Example
    ///
    /// ```
    /// use coin_pulse::scraper::{TableParser, TableSelectors};
    ///
    /// let parser = TableParser::new(&TableSelectors::default()).unwrap();
    /// let html = r#"<table class="cmc-table"><tbody><tr><td></td><td>1</td></tr></tbody></table>"#;
    /// let records = parser.parse(html);
    /// assert_eq!(records[0].rank, Some(1));
    /// ```
    pub fn parse(&self, html: &str) -> Vec<CoinRecord> {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&self.table).next() else {
            tracing::debug!("Coin table not found in page content");
            return Vec::new();
        };

        table.select(&self.row).map(|row| self.parse_row(row)).collect()
    }

    fn parse_row(&self, row: ElementRef<'_>) -> CoinRecord {
        CoinRecord {
            rank: select_text(row, &self.rank).and_then(|text| match parse_rank(&text) {
                Ok(rank) => Some(rank),
                Err(e) => {
                    tracing::warn!("Failed to parse rank: {}", e);
                    None
                }
            }),
            name: select_text(row, &self.name).filter(|text| !text.is_empty()),
            symbol: select_text(row, &self.symbol).filter(|text| !text.is_empty()),
            price: numeric_field(row, &self.price, "price"),
            change_24h: numeric_field(row, &self.change_24h, "change_24h"),
            market_cap: numeric_field(row, &self.market_cap, "market_cap"),
        }
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PulseError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Trimmed text of the first element matching `selector` inside `row`
fn select_text(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

fn numeric_field(row: ElementRef<'_>, selector: &Selector, field: &str) -> Option<f64> {
    let text = select_text(row, selector)?;
    match parse_numeric(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}", field, e);
            None
        }
    }
}
