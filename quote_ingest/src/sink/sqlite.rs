//! Diesel/SQLite implementation of [`QuoteSink`].

use chrono::NaiveDate;
use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::prelude::*;
use diesel::{SqliteConnection, insert_into};

use crate::db::connection::connect_sqlite;
use crate::error::{SinkError, SinkResult};
use crate::models::{NewSectorQuote, NewStockQuote};
use crate::schema::{weekly_sector_quotes as wsec, weekly_stock_quotes as wsq};
use crate::sink::{ConnectionSettings, QuoteSink, SinkConnector};
use crate::{Quote, QuoteKind};

/// Sink over one SQLite connection.
///
/// Transactions are opened with `BEGIN IMMEDIATE`, so the existence probes and
/// inserts of one envelope hold the write lock together.
pub struct SqliteSink {
    conn: SqliteConnection,
    in_tx: bool,
}

impl SqliteSink {
    /// Wraps an open connection.
    pub fn new(conn: SqliteConnection) -> Self {
        Self { conn, in_tx: false }
    }

    /// Underlying connection, e.g. for inspection in tests.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl QuoteSink for SqliteSink {
    fn exists(
        &mut self,
        kind: QuoteKind,
        entity_code: &str,
        quote_date: NaiveDate,
    ) -> SinkResult<bool> {
        let n: i64 = match kind {
            QuoteKind::Stock => wsq::table
                .filter(wsq::stock_code.eq(entity_code))
                .filter(wsq::quote_date.eq(quote_date))
                .count()
                .get_result(&mut self.conn)?,
            QuoteKind::Sector => wsec::table
                .filter(wsec::sector_code.eq(entity_code))
                .filter(wsec::quote_date.eq(quote_date))
                .count()
                .get_result(&mut self.conn)?,
        };
        Ok(n > 0)
    }

    fn begin(&mut self) -> SinkResult<()> {
        if self.in_tx {
            return Err(SinkError::Transaction("begin while a transaction is open"));
        }
        AnsiTransactionManager::begin_transaction_sql(&mut self.conn, "BEGIN IMMEDIATE")?;
        self.in_tx = true;
        Ok(())
    }

    fn insert(&mut self, kind: QuoteKind, quote: &Quote) -> SinkResult<()> {
        if !self.in_tx {
            return Err(SinkError::Transaction("insert outside a transaction"));
        }
        match kind {
            QuoteKind::Stock => insert_into(wsq::table)
                .values(&NewStockQuote::from(quote))
                .execute(&mut self.conn)?,
            QuoteKind::Sector => insert_into(wsec::table)
                .values(&NewSectorQuote::from(quote))
                .execute(&mut self.conn)?,
        };
        Ok(())
    }

    fn commit(&mut self) -> SinkResult<()> {
        if !self.in_tx {
            return Err(SinkError::Transaction("commit without begin"));
        }
        self.in_tx = false;
        AnsiTransactionManager::commit_transaction(&mut self.conn)?;
        Ok(())
    }

    fn rollback(&mut self) -> SinkResult<()> {
        if !self.in_tx {
            return Err(SinkError::Transaction("rollback without begin"));
        }
        self.in_tx = false;
        AnsiTransactionManager::rollback_transaction(&mut self.conn)?;
        Ok(())
    }
}

/// Opens a [`SqliteSink`] on `settings.database`.
///
/// SQLite has no server login; host and user are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl SinkConnector for SqliteConnector {
    type Sink = SqliteSink;

    fn connect(&self, settings: &ConnectionSettings) -> SinkResult<SqliteSink> {
        tracing::info!(
            host = %settings.host,
            user = %settings.user,
            database = %settings.database,
            "opening sqlite sink"
        );
        let conn = connect_sqlite(&settings.database)?;
        Ok(SqliteSink::new(conn))
    }
}
