//! SQLite connection helpers.
//!
//! [`connect_sqlite`] opens a connection and applies connection-wide PRAGMAs:
//! WAL journaling and a 5000ms busy_timeout, so a second worker waiting on
//! `BEGIN IMMEDIATE` retries inside SQLite instead of failing at once.

use anyhow::Context;
use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

/// Strip a `sqlite://` or `sqlite:` scheme; Diesel wants a path or `file:` URI.
pub fn normalize_sqlite_url(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> anyhow::Result<SqliteConnection> {
    let url = normalize_sqlite_url(database_url);
    let mut conn =
        SqliteConnection::establish(url).with_context(|| format!("open sqlite database {url}"))?;

    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}
