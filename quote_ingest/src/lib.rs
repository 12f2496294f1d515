//! Idempotent ingestion of weekly stock and sector quotes.
//!
//! A queue dispatcher hands [`ingest::Ingestor::run`] one batch of message
//! envelopes per invocation. Each envelope is classified ([`envelope::classify`]),
//! decoded into typed [`quote::Quote`]s ([`envelope::extract_quotes`]), filtered
//! against the sink ([`probe`], [`plan`]) and written in one transaction per
//! envelope ([`commit`]).
//!
//! Storage and secrets are collaborators behind traits:
//! - [`sink::QuoteSink`] / [`sink::SinkConnector`], with a Diesel/SQLite
//!   implementation in [`sink::sqlite`] and an in-memory one in [`sink::memory`]
//! - [`credentials::CredentialsProvider`] for connection parameters

#![warn(missing_docs)]

pub mod commit;
pub mod config;
pub mod credentials;
pub mod db;
pub mod envelope;
pub mod error;
pub mod ingest;
pub mod kind;
pub mod models;
pub mod plan;
pub mod probe;
pub mod quote;
#[allow(missing_docs)]
pub mod schema;
pub mod sink;

pub use error::{IngestError, SinkError};
pub use kind::QuoteKind;
pub use quote::Quote;
