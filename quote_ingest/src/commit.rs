//! Batch committer: writes one message's plan atomically.
//!
//! The caller opens the transaction (before probing) with
//! [`QuoteSink::begin`]; [`commit`] inserts every planned quote and commits
//! once. The first failing insert rolls the whole message back.

use crate::error::{IngestError, MessageRef, Result};
use crate::plan::InsertPlan;
use crate::sink::QuoteSink;

/// What a successful commit wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitOutcome {
    /// Rows inserted.
    pub inserted: usize,
}

/// Inserts `plan` into its kind's table and commits the open transaction.
///
/// `message` names the envelope the plan came from in error reports. An empty
/// plan still commits, ending the transaction the probes ran in.
pub fn commit<S: QuoteSink + ?Sized>(
    plan: &InsertPlan,
    message: &MessageRef,
    sink: &mut S,
) -> Result<CommitOutcome> {
    let kind = plan.kind();

    for q in plan.quotes() {
        if let Err(source) = sink.insert(kind, q) {
            tracing::error!(
                %kind, code = %q.entity_code, date = %q.quote_date, error = %source,
                "insert failed, rolling back message"
            );
            rollback_quietly(sink);
            return Err(IngestError::InsertFailed {
                message: message.clone(),
                kind,
                entity_code: q.entity_code.clone(),
                quote_date: q.quote_date,
                source,
            });
        }
    }

    sink.commit().map_err(|source| IngestError::SinkUnavailable {
        context: format!("commit of {} rows into {} for {message}", plan.len(), kind.table_name()),
        source,
    })?;

    Ok(CommitOutcome {
        inserted: plan.len(),
    })
}

/// Rolls back the open transaction, logging (not returning) a failure so the
/// error that caused the rollback is the one reported.
pub(crate) fn rollback_quietly<S: QuoteSink + ?Sized>(sink: &mut S) {
    if let Err(e) = sink.rollback() {
        tracing::error!(error = %e, "rollback failed");
    }
}
