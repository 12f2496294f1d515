//! Diesel insertables for the quote tables in [`crate::schema`].
//!
//! Field order follows the insert column order:
//! `quote_date, <code>, open_price, high_price, low_price, close_price, volume`.

use chrono::NaiveDate;
use diesel::prelude::*;

use crate::Quote;
use crate::schema::{weekly_sector_quotes, weekly_stock_quotes};

/// Insertable row for [`crate::schema::weekly_stock_quotes`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = weekly_stock_quotes)]
pub struct NewStockQuote<'a> {
    /// Week of the quote.
    pub quote_date: NaiveDate,
    /// Ticker.
    pub stock_code: &'a str,
    /// Opening price.
    pub open_price: f64,
    /// Highest price.
    pub high_price: f64,
    /// Lowest price.
    pub low_price: f64,
    /// Closing price.
    pub close_price: f64,
    /// Traded volume.
    pub volume: i64,
}

/// Insertable row for [`crate::schema::weekly_sector_quotes`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = weekly_sector_quotes)]
pub struct NewSectorQuote<'a> {
    /// Week of the quote.
    pub quote_date: NaiveDate,
    /// Sector code.
    pub sector_code: &'a str,
    /// Opening price.
    pub open_price: f64,
    /// Highest price.
    pub high_price: f64,
    /// Lowest price.
    pub low_price: f64,
    /// Closing price.
    pub close_price: f64,
    /// Traded volume.
    pub volume: i64,
}

impl<'a> From<&'a Quote> for NewStockQuote<'a> {
    fn from(q: &'a Quote) -> Self {
        Self {
            quote_date: q.quote_date,
            stock_code: &q.entity_code,
            open_price: q.open_price,
            high_price: q.high_price,
            low_price: q.low_price,
            close_price: q.close_price,
            volume: q.volume,
        }
    }
}

impl<'a> From<&'a Quote> for NewSectorQuote<'a> {
    fn from(q: &'a Quote) -> Self {
        Self {
            quote_date: q.quote_date,
            sector_code: &q.entity_code,
            open_price: q.open_price,
            high_price: q.high_price,
            low_price: q.low_price,
            close_price: q.close_price,
            volume: q.volume,
        }
    }
}
