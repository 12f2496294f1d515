//! Canonical in-memory representation of one weekly quote (OHLCV).

use chrono::NaiveDate;
use serde::Serialize;

/// One date-keyed OHLCV observation for a stock or a sector.
///
/// The same shape serves both kinds; [`crate::QuoteKind`] decides where it is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    /// Week the quote belongs to.
    pub quote_date: NaiveDate,
    /// Ticker (stock) or sector code (sector).
    pub entity_code: String,
    /// Opening price.
    pub open_price: f64,
    /// Highest price.
    pub high_price: f64,
    /// Lowest price.
    pub low_price: f64,
    /// Closing price.
    pub close_price: f64,
    /// Traded volume; never negative.
    pub volume: i64,
}

impl Quote {
    /// Natural key within a kind's table.
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.entity_code, self.quote_date)
    }
}
