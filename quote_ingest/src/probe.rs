//! Existence probe: one point lookup per candidate quote.

use chrono::NaiveDate;

use crate::QuoteKind;
use crate::error::{IngestError, Result};
use crate::sink::QuoteSink;

/// Whether `kind`'s table already holds `(entity_code, quote_date)`.
///
/// Read-only. A sink failure becomes [`IngestError::SinkUnavailable`].
pub fn exists<S: QuoteSink + ?Sized>(
    sink: &mut S,
    kind: QuoteKind,
    entity_code: &str,
    quote_date: NaiveDate,
) -> Result<bool> {
    sink.exists(kind, entity_code, quote_date)
        .map_err(|source| IngestError::SinkUnavailable {
            context: format!(
                "existence check on {} for ({entity_code}, {quote_date})",
                kind.table_name()
            ),
            source,
        })
}
