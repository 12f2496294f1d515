//! Database utilities for connections and schema bootstrap.
//!
//! This module provides:
//! - SQLite connection helper: [`connection::connect_sqlite`] applies WAL and a 5000ms busy_timeout.
//! - Embedded Diesel migrations creating the two quote tables: [`migrate::run_sqlite`].
//!   Production databases are provisioned elsewhere; this is for local runs and tests.
//!
//! Example:
//! ```no_run
//! use quote_ingest::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("quote_ingest_example.db");
//! migrate::run_sqlite(db_path.to_str().unwrap()).expect("migrations");
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;
