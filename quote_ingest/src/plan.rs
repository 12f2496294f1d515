//! Insertion planning: which quotes of a message still need a row.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::Result;
use crate::{Quote, QuoteKind};

/// Planner knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Queue only the first copy of a key repeated within one payload.
    ///
    /// When off, every copy that probes as absent is queued and the sink's
    /// key constraint rejects the second insert.
    pub dedupe_within_payload: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            dedupe_within_payload: true,
        }
    }
}

/// Ordered quotes selected for insertion from one message.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    kind: QuoteKind,
    quotes: Vec<Quote>,
    skipped_existing: usize,
    skipped_duplicate: usize,
}

impl InsertPlan {
    /// Kind every planned quote is routed to.
    pub fn kind(&self) -> QuoteKind {
        self.kind
    }

    /// Planned quotes in input order.
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Number of planned inserts.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// True if nothing needs inserting.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Quotes skipped because the sink already holds their key.
    pub fn skipped_existing(&self) -> usize {
        self.skipped_existing
    }

    /// Quotes skipped as repeats of a key queued earlier in the same payload.
    pub fn skipped_duplicate(&self) -> usize {
        self.skipped_duplicate
    }
}

/// Filters `quotes` down to the ones `exists_fn` reports absent, keeping order.
///
/// `exists_fn` is called once per candidate, in input order; its first error
/// aborts planning. A skipped quote is logged, never an error.
pub fn plan<F>(quotes: Vec<Quote>, kind: QuoteKind, mut exists_fn: F, opts: PlanOptions) -> Result<InsertPlan>
where
    F: FnMut(&Quote) -> Result<bool>,
{
    let mut skipped_existing = 0;
    let mut skipped_duplicate = 0;
    let mut keep = Vec::with_capacity(quotes.len());
    let mut queued: HashSet<(&str, NaiveDate)> = HashSet::new();

    for q in &quotes {
        if opts.dedupe_within_payload && queued.contains(&q.key()) {
            tracing::warn!(
                %kind, code = %q.entity_code, date = %q.quote_date,
                "skipping repeated quote within payload"
            );
            skipped_duplicate += 1;
            keep.push(false);
            continue;
        }

        if exists_fn(q)? {
            tracing::warn!(%kind, code = %q.entity_code, date = %q.quote_date, "skipping existing quote");
            skipped_existing += 1;
            keep.push(false);
            continue;
        }

        tracing::debug!(%kind, code = %q.entity_code, date = %q.quote_date, "queuing for insert");
        if opts.dedupe_within_payload {
            queued.insert(q.key());
        }
        keep.push(true);
    }
    drop(queued);

    Ok(InsertPlan {
        kind,
        quotes: quotes
            .into_iter()
            .zip(keep)
            .filter_map(|(q, kept)| kept.then_some(q))
            .collect(),
        skipped_existing,
        skipped_duplicate,
    })
}
