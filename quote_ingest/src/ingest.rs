//! Ingestion orchestrator: one invocation, one batch.
//!
//! ## Flow
//! 1. Validate the batch shape (`Records` must be a list). Nothing else is
//!    touched when it is not.
//! 2. Resolve connection parameters through the [`CredentialsProvider`].
//! 3. Open one sink for the whole invocation; it is dropped on every exit path.
//! 4. For each message, in order: decode → classify → extract → `BEGIN` →
//!    probe/plan → insert + `COMMIT` (or `ROLLBACK` in dry-run).
//!
//! ## Failure policy
//! The first error aborts the invocation. The failing message's transaction is
//! rolled back; messages committed before it stay committed; messages after it
//! are never visited. The dispatcher decides about redelivery.

use serde::Serialize;
use serde_json::Value;

use crate::commit::{commit, rollback_quietly};
use crate::config::IngestConfig;
use crate::credentials::{CredentialsProvider, resolve_settings};
use crate::envelope::{MessageEnvelope, classify, extract_quotes};
use crate::error::{IngestError, Result};
use crate::plan::plan;
use crate::probe;
use crate::sink::{QuoteSink, SinkConnector};
use crate::QuoteKind;

/// Event key holding the message list.
pub const RECORDS_KEY: &str = "Records";

/// Report for one processed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageOutcome {
    /// Position in the batch.
    pub index: usize,
    /// Queue message id, if any.
    pub message_id: Option<String>,
    /// Kind the message was routed to.
    pub kind: QuoteKind,
    /// Quotes in the payload.
    pub received: usize,
    /// Quotes already present in the sink.
    pub skipped_existing: usize,
    /// Repeats of a key queued earlier in the same payload.
    pub skipped_duplicate: usize,
    /// Quotes planned for insertion.
    pub planned: usize,
    /// Rows written (0 in dry-run).
    pub inserted: usize,
}

/// Aggregate result of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    /// Per-message reports, in batch order.
    pub messages: Vec<MessageOutcome>,
    /// Whether writes were rolled back instead of committed.
    pub dry_run: bool,
}

impl OutcomeSummary {
    /// Rows written across the batch.
    pub fn total_inserted(&self) -> usize {
        self.messages.iter().map(|m| m.inserted).sum()
    }

    /// Quotes skipped (existing or repeated) across the batch.
    pub fn total_skipped(&self) -> usize {
        self.messages
            .iter()
            .map(|m| m.skipped_existing + m.skipped_duplicate)
            .sum()
    }

    /// Status object handed back to the dispatcher.
    pub fn to_response(&self) -> InvocationResponse {
        InvocationResponse::success()
    }
}

/// `{statusCode, body}` returned to the dispatcher on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResponse {
    /// HTTP-style status code.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded body.
    pub body: String,
}

impl InvocationResponse {
    /// `200` with the JSON string `"Success"`.
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: "\"Success\"".to_string(),
        }
    }
}

/// The batch ingestion entry point.
///
/// Generic over its collaborators so tests can swap in the in-memory sink and
/// static credentials.
pub struct Ingestor<P, C> {
    credentials: P,
    connector: C,
    config: IngestConfig,
}

impl<P, C> Ingestor<P, C>
where
    P: CredentialsProvider,
    C: SinkConnector,
{
    /// Builds an ingestor from its collaborators.
    pub fn new(credentials: P, connector: C, config: IngestConfig) -> Self {
        Self {
            credentials,
            connector,
            config,
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Processes one batch event.
    pub fn run(&self, event: &Value) -> Result<OutcomeSummary> {
        let records =
            batch_records(event).inspect_err(|e| tracing::error!(error = %e, "rejecting batch"))?;
        tracing::info!(messages = records.len(), dry_run = self.config.dry_run, "received batch");

        let settings = resolve_settings(&self.credentials, &self.config.parameters)?;
        let mut sink = self
            .connector
            .connect(&settings)
            .map_err(|source| IngestError::SinkUnavailable {
                context: format!("connect to {}", settings.database),
                source,
            })?;

        let mut summary = OutcomeSummary {
            messages: Vec::with_capacity(records.len()),
            dry_run: self.config.dry_run,
        };
        for (index, record) in records.iter().enumerate() {
            let outcome = self
                .process_message(&mut sink, index, record)
                .inspect_err(|e| tracing::error!(index, error = %e, "aborting batch"))?;
            summary.messages.push(outcome);
        }

        tracing::info!(
            messages = summary.messages.len(),
            inserted = summary.total_inserted(),
            skipped = summary.total_skipped(),
            "batch done"
        );
        Ok(summary)
    }

    fn process_message(
        &self,
        sink: &mut C::Sink,
        index: usize,
        record: &Value,
    ) -> Result<MessageOutcome> {
        let envelope = MessageEnvelope::decode(index, record)?;
        let _span = tracing::info_span!(
            "message",
            index,
            message_id = envelope.message_id.as_deref().unwrap_or("")
        )
        .entered();

        let kind = classify(&envelope)?;
        let quotes = extract_quotes(&envelope, kind)?;
        let received = quotes.len();

        sink.begin().map_err(|source| IngestError::SinkUnavailable {
            context: format!("begin transaction for message {index}"),
            source,
        })?;

        let planned = plan(
            quotes,
            kind,
            |q| probe::exists(&mut *sink, kind, &q.entity_code, q.quote_date),
            self.config.plan_options(),
        );
        let insert_plan = match planned {
            Ok(p) => p,
            Err(e) => {
                rollback_quietly(sink);
                return Err(e);
            }
        };

        let inserted = if self.config.dry_run {
            sink.rollback().map_err(|source| IngestError::SinkUnavailable {
                context: format!("dry-run rollback for message {index}"),
                source,
            })?;
            0
        } else {
            commit(&insert_plan, &envelope.message_ref(), sink)?.inserted
        };

        tracing::info!(
            %kind,
            received,
            planned = insert_plan.len(),
            inserted,
            "message processed"
        );
        Ok(MessageOutcome {
            index,
            message_id: envelope.message_id,
            kind,
            received,
            skipped_existing: insert_plan.skipped_existing(),
            skipped_duplicate: insert_plan.skipped_duplicate(),
            planned: insert_plan.len(),
            inserted,
        })
    }
}

/// The `Records` list of a batch event.
pub fn batch_records(event: &Value) -> Result<&[Value]> {
    let invalid = |reason: &str| IngestError::InvalidBatch {
        reason: reason.to_string(),
    };
    match event.as_object().map(|o| o.get(RECORDS_KEY)) {
        None => Err(invalid("event is not a JSON object")),
        Some(None) => Err(invalid("event has no Records")),
        Some(Some(Value::Array(records))) => Ok(records.as_slice()),
        Some(Some(_)) => Err(invalid("Records is not a list")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn batch_shape_is_checked() {
        assert!(matches!(batch_records(&json!({})), Err(IngestError::InvalidBatch { .. })));
        assert!(matches!(batch_records(&json!([])), Err(IngestError::InvalidBatch { .. })));
        assert!(matches!(
            batch_records(&json!({ "Records": "x" })),
            Err(IngestError::InvalidBatch { .. })
        ));
        assert_eq!(batch_records(&json!({ "Records": [] })).unwrap().len(), 0);
        assert_eq!(batch_records(&json!({ "Records": [1, 2] })).unwrap().len(), 2);
    }

    #[test]
    fn response_is_the_success_object() {
        let r = OutcomeSummary::default().to_response();
        assert_eq!(r.status_code, 200);
        assert_eq!(r.body, "\"Success\"");
    }
}
