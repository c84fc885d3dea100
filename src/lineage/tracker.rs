//! Lineage tracker
//!
//! Scopes one subtask run's writes to a raw batch. Each output table is
//! cleared of the batch's previous rows exactly once, before the run's first
//! write to it.

use super::types::{RawDataBatch, RawDataOrigin};
use crate::error::Result;
use crate::store::Store;
use std::collections::BTreeMap;

/// Tracks which output tables have been cleared for a batch
pub struct LineageTracker<'a> {
    store: &'a dyn Store,
    batch: RawDataBatch,
    cleared: BTreeMap<String, usize>,
}

impl<'a> LineageTracker<'a> {
    /// Create a tracker for `batch`
    pub fn new(store: &'a dyn Store, batch: RawDataBatch) -> Self {
        Self {
            store,
            batch,
            cleared: BTreeMap::new(),
        }
    }

    /// The batch writes are scoped to
    pub fn batch(&self) -> &RawDataBatch {
        &self.batch
    }

    /// Clear the batch's rows from `table` unless already done this run
    ///
    /// Returns the number of rows removed (0 when already cleared).
    pub fn clear(&mut self, table: &str) -> Result<usize> {
        if self.cleared.contains_key(table) {
            return Ok(0);
        }
        let deleted = self.store.delete_lineage(table, &self.batch)?;
        tracing::debug!(
            table,
            raw_table = %self.batch.source_table,
            params = %self.batch.params_fingerprint,
            deleted,
            "cleared previous rows of batch"
        );
        self.cleared.insert(table.to_string(), deleted);
        Ok(deleted)
    }

    /// Whether `table` was already cleared this run
    pub fn is_cleared(&self, table: &str) -> bool {
        self.cleared.contains_key(table)
    }

    /// Rows removed per table during this run
    pub fn cleared(&self) -> &BTreeMap<String, usize> {
        &self.cleared
    }

    /// Lineage for a row derived from an input row
    ///
    /// The batch columns come from the tracker; the raw row id and remark
    /// are inherited from the input so each output points at its raw record.
    pub fn origin_for(&self, input: &RawDataOrigin) -> RawDataOrigin {
        RawDataOrigin {
            raw_data_table: self.batch.source_table.clone(),
            raw_data_params: self.batch.params_fingerprint.clone(),
            raw_data_id: input.raw_data_id,
            raw_data_remark: input.raw_data_remark.clone(),
        }
    }
}
