//! Relational sink abstraction.
//!
//! The pipeline talks to storage only through [`QuoteSink`]: a point existence
//! lookup plus explicit transaction control around inserts. A [`SinkConnector`]
//! opens one sink per invocation from resolved [`ConnectionSettings`]; dropping
//! the sink releases the connection.
//!
//! Implementations:
//! - [`sqlite::SqliteSink`]: Diesel over SQLite, `BEGIN IMMEDIATE` transactions
//! - [`memory::MemorySink`]: in-process tables with the same natural-key rule,
//!   plus a call journal

pub mod memory;
pub mod sqlite;

use chrono::NaiveDate;
use secrecy::SecretString;

use crate::error::SinkResult;
use crate::{Quote, QuoteKind};

/// Connection parameters resolved from the credentials provider.
#[derive(Debug)]
pub struct ConnectionSettings {
    /// Database host.
    pub host: String,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: SecretString,
    /// Database name; file path or URL for SQLite.
    pub database: String,
}

/// Storage operations the pipeline needs, routed by [`QuoteKind`].
///
/// Inserts are only valid between [`QuoteSink::begin`] and
/// [`QuoteSink::commit`]/[`QuoteSink::rollback`].
pub trait QuoteSink {
    /// Whether a row for `(entity_code, quote_date)` exists in `kind`'s table.
    fn exists(&mut self, kind: QuoteKind, entity_code: &str, quote_date: NaiveDate)
    -> SinkResult<bool>;

    /// Opens the transaction for one envelope.
    fn begin(&mut self) -> SinkResult<()>;

    /// Inserts one row into `kind`'s table.
    fn insert(&mut self, kind: QuoteKind, quote: &Quote) -> SinkResult<()>;

    /// Makes the open transaction durable.
    fn commit(&mut self) -> SinkResult<()>;

    /// Discards the open transaction.
    fn rollback(&mut self) -> SinkResult<()>;
}

impl<S: QuoteSink + ?Sized> QuoteSink for &mut S {
    fn exists(
        &mut self,
        kind: QuoteKind,
        entity_code: &str,
        quote_date: NaiveDate,
    ) -> SinkResult<bool> {
        (**self).exists(kind, entity_code, quote_date)
    }

    fn begin(&mut self) -> SinkResult<()> {
        (**self).begin()
    }

    fn insert(&mut self, kind: QuoteKind, quote: &Quote) -> SinkResult<()> {
        (**self).insert(kind, quote)
    }

    fn commit(&mut self) -> SinkResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> SinkResult<()> {
        (**self).rollback()
    }
}

/// Opens a [`QuoteSink`] for one invocation.
pub trait SinkConnector {
    /// Sink type produced by this connector.
    type Sink: QuoteSink;

    /// Establishes the connection.
    fn connect(&self, settings: &ConnectionSettings) -> SinkResult<Self::Sink>;
}
