//! Batched writer
//!
//! Buffers output rows per target table and upserts a table's buffer once it
//! reaches the batch size. Remaining buffers are flushed in table-name order.

use crate::error::Result;
use crate::store::{Store, StoredRow};
use std::collections::BTreeMap;

/// Per-table buffered upserts
pub struct BatchWriter<'a> {
    store: &'a dyn Store,
    batch_size: usize,
    buffers: BTreeMap<&'static str, Vec<StoredRow>>,
    flushes: usize,
}

impl<'a> BatchWriter<'a> {
    /// Create a writer flushing every `batch_size` rows per table
    pub fn new(store: &'a dyn Store, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            buffers: BTreeMap::new(),
            flushes: 0,
        }
    }

    /// Buffer a row for `table`, flushing that table when full
    pub fn push(&mut self, table: &'static str, row: StoredRow) -> Result<()> {
        let buffer = self.buffers.entry(table).or_default();
        buffer.push(row);
        if buffer.len() >= self.batch_size {
            self.flush(table)?;
        }
        Ok(())
    }

    /// Flush one table's buffer
    pub fn flush(&mut self, table: &'static str) -> Result<()> {
        let Some(buffer) = self.buffers.get_mut(table) else {
            return Ok(());
        };
        if buffer.is_empty() {
            return Ok(());
        }
        let rows = std::mem::take(buffer);
        self.store.upsert(table, &rows)?;
        self.flushes += 1;
        tracing::debug!(table, rows = rows.len(), "flushed batch");
        Ok(())
    }

    /// Flush every buffered table
    pub fn flush_all(&mut self) -> Result<()> {
        let tables: Vec<&'static str> = self.buffers.keys().copied().collect();
        for table in tables {
            self.flush(table)?;
        }
        Ok(())
    }

    /// Rows buffered and not yet written
    pub fn pending(&self) -> usize {
        self.buffers.values().map(Vec::len).sum()
    }

    /// Number of upserts issued so far
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}
