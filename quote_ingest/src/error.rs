//! Error types for the ingestion pipeline.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::QuoteKind;
use crate::credentials::CredentialsError;

/// Errors reported by a [`crate::sink::QuoteSink`] or [`crate::sink::SinkConnector`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// Query or transaction failure from Diesel.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failure while establishing or configuring a connection.
    #[error("connection error: {0:#}")]
    Connection(#[from] anyhow::Error),

    /// A write would violate the `(entity_code, quote_date)` key.
    #[error("duplicate key ({entity_code}, {quote_date}) in {table}")]
    DuplicateKey {
        /// Table the write targeted.
        table: &'static str,
        /// Entity code of the rejected row.
        entity_code: String,
        /// Date of the rejected row.
        quote_date: NaiveDate,
    },

    /// Transaction control was called out of order (e.g. commit without begin).
    #[error("transaction state error: {0}")]
    Transaction(&'static str),
}

/// Result alias for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Position and queue id of the message an error belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRef {
    /// Zero-based position in the batch's `Records` list.
    pub index: usize,
    /// Queue message id, when the envelope carried one.
    pub message_id: Option<String>,
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message #{}", self.index)?;
        if let Some(id) = &self.message_id {
            write!(f, " ({id})")?;
        }
        Ok(())
    }
}

/// Errors that abort an ingestion invocation.
///
/// There is no per-message isolation: the first error ends the run and is
/// handed back to the dispatcher, which owns redelivery.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The event carries no `Records` list.
    #[error("invalid batch: {reason}")]
    InvalidBatch {
        /// What was wrong with the event.
        reason: String,
    },

    /// Envelope could not be decoded or its quote-kind tag is missing/unknown.
    #[error("malformed envelope in {message}: {reason} (QuoteType = {value:?})")]
    MalformedEnvelope {
        /// Failing message.
        message: MessageRef,
        /// Offending tag value, `None` when absent.
        value: Option<String>,
        /// What was wrong.
        reason: String,
    },

    /// Body is not JSON, lacks `quoteObject`, or a field has the wrong type.
    #[error("malformed {kind} payload in {message}: {reason}")]
    MalformedPayload {
        /// Failing message.
        message: MessageRef,
        /// Kind the payload was decoded as.
        kind: QuoteKind,
        /// What was wrong.
        reason: String,
    },

    /// A quote lacks a field required for its kind.
    #[error("{kind} quote #{position} in {message} is missing field `{field}`")]
    MissingField {
        /// Failing message.
        message: MessageRef,
        /// Kind the quote was decoded as.
        kind: QuoteKind,
        /// Zero-based index of the quote within `quoteObject`.
        position: usize,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A connection parameter could not be resolved.
    #[error("failed to resolve parameter {path}")]
    Credentials {
        /// Parameter path that was requested.
        path: String,
        /// Provider failure.
        #[source]
        source: CredentialsError,
    },

    /// Connecting, probing or transaction control failed.
    #[error("sink unavailable during {context}")]
    SinkUnavailable {
        /// Operation that was running.
        context: String,
        /// Sink failure.
        #[source]
        source: SinkError,
    },

    /// An insert failed; the envelope's transaction was rolled back.
    #[error("insert of {kind} quote ({entity_code}, {quote_date}) in {message} failed")]
    InsertFailed {
        /// Failing message.
        message: MessageRef,
        /// Kind of the failing quote.
        kind: QuoteKind,
        /// Entity code of the failing quote.
        entity_code: String,
        /// Date of the failing quote.
        quote_date: NaiveDate,
        /// Sink failure.
        #[source]
        source: SinkError,
    },
}

/// Result alias for the ingestion pipeline.
pub type Result<T> = std::result::Result<T, IngestError>;
