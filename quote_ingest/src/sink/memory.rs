//! In-process sink with the same natural-key rule as the SQL tables.
//!
//! Rows live in a [`MemoryStore`] shared between the connector and every sink
//! it opens, so a caller can inspect committed rows and the ordered call
//! journal after an invocation finishes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::error::{SinkError, SinkResult};
use crate::sink::{ConnectionSettings, QuoteSink, SinkConnector};
use crate::{Quote, QuoteKind};

/// One observed sink operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    /// A connection was opened.
    Connect,
    /// Existence probe for `(kind, code, date)`.
    Exists(QuoteKind, String, NaiveDate),
    /// Transaction opened.
    Begin,
    /// Insert attempted for `(kind, code, date)`.
    Insert(QuoteKind, String, NaiveDate),
    /// Transaction committed.
    Commit,
    /// Transaction rolled back.
    Rollback,
}

type Table = BTreeMap<(String, NaiveDate), Quote>;

/// Committed rows per kind plus the call journal.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stock: Table,
    sector: Table,
    journal: Vec<SinkCall>,
}

impl MemoryStore {
    fn table(&self, kind: QuoteKind) -> &Table {
        match kind {
            QuoteKind::Stock => &self.stock,
            QuoteKind::Sector => &self.sector,
        }
    }

    fn table_mut(&mut self, kind: QuoteKind) -> &mut Table {
        match kind {
            QuoteKind::Stock => &mut self.stock,
            QuoteKind::Sector => &mut self.sector,
        }
    }
}

/// Opens [`MemorySink`]s over one shared [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryConnector {
    /// Connector over an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a committed row directly, bypassing the journal.
    pub fn seed(&self, kind: QuoteKind, quote: Quote) {
        let key = (quote.entity_code.clone(), quote.quote_date);
        lock(&self.store).table_mut(kind).insert(key, quote);
    }

    /// Committed rows of `kind`, ordered by `(code, date)`.
    pub fn rows(&self, kind: QuoteKind) -> Vec<Quote> {
        lock(&self.store).table(kind).values().cloned().collect()
    }

    /// Every operation observed so far, in order.
    pub fn calls(&self) -> Vec<SinkCall> {
        lock(&self.store).journal.clone()
    }

    /// Number of journal entries matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        lock(&self.store).journal.iter().filter(|c| pred(c)).count()
    }
}

impl SinkConnector for MemoryConnector {
    type Sink = MemorySink;

    fn connect(&self, settings: &ConnectionSettings) -> SinkResult<MemorySink> {
        tracing::debug!(database = %settings.database, "opening memory sink");
        lock(&self.store).journal.push(SinkCall::Connect);
        Ok(MemorySink {
            store: Arc::clone(&self.store),
            staged: None,
        })
    }
}

/// Sink handle; inserts are staged until commit.
#[derive(Debug)]
pub struct MemorySink {
    store: Arc<Mutex<MemoryStore>>,
    staged: Option<Vec<(QuoteKind, Quote)>>,
}

impl MemorySink {
    fn staged_contains(&self, kind: QuoteKind, key: (&str, NaiveDate)) -> bool {
        self.staged
            .iter()
            .flatten()
            .any(|(k, q)| *k == kind && q.key() == key)
    }
}

impl QuoteSink for MemorySink {
    fn exists(
        &mut self,
        kind: QuoteKind,
        entity_code: &str,
        quote_date: NaiveDate,
    ) -> SinkResult<bool> {
        let mut store = lock(&self.store);
        store
            .journal
            .push(SinkCall::Exists(kind, entity_code.to_string(), quote_date));
        let committed = store
            .table(kind)
            .contains_key(&(entity_code.to_string(), quote_date));
        drop(store);
        Ok(committed || self.staged_contains(kind, (entity_code, quote_date)))
    }

    fn begin(&mut self) -> SinkResult<()> {
        lock(&self.store).journal.push(SinkCall::Begin);
        if self.staged.is_some() {
            return Err(SinkError::Transaction("begin while a transaction is open"));
        }
        self.staged = Some(Vec::new());
        Ok(())
    }

    fn insert(&mut self, kind: QuoteKind, quote: &Quote) -> SinkResult<()> {
        let mut store = lock(&self.store);
        store.journal.push(SinkCall::Insert(
            kind,
            quote.entity_code.clone(),
            quote.quote_date,
        ));
        let committed = store
            .table(kind)
            .contains_key(&(quote.entity_code.clone(), quote.quote_date));
        drop(store);

        if self.staged.is_none() {
            return Err(SinkError::Transaction("insert outside a transaction"));
        }
        if committed || self.staged_contains(kind, quote.key()) {
            return Err(SinkError::DuplicateKey {
                table: kind.table_name(),
                entity_code: quote.entity_code.clone(),
                quote_date: quote.quote_date,
            });
        }
        if let Some(staged) = self.staged.as_mut() {
            staged.push((kind, quote.clone()));
        }
        Ok(())
    }

    fn commit(&mut self) -> SinkResult<()> {
        let mut store = lock(&self.store);
        store.journal.push(SinkCall::Commit);
        let staged = self
            .staged
            .take()
            .ok_or(SinkError::Transaction("commit without begin"))?;
        for (kind, quote) in staged {
            let key = (quote.entity_code.clone(), quote.quote_date);
            store.table_mut(kind).insert(key, quote);
        }
        Ok(())
    }

    fn rollback(&mut self) -> SinkResult<()> {
        lock(&self.store).journal.push(SinkCall::Rollback);
        self.staged
            .take()
            .map(|_| ())
            .ok_or(SinkError::Transaction("rollback without begin"))
    }
}

// A panic while holding the lock leaves the tables consistent; keep going.
fn lock(store: &Mutex<MemoryStore>) -> MutexGuard<'_, MemoryStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
