//! Streaming converter
//!
//! Drives a cursor over stored rows, applies a per-row transform that may
//! emit any number of output records, and writes the outputs in batches
//! tagged with the lineage of the running subtask.
//!
//! # Overview
//!
//! The convert module provides:
//! - `DataConverter` - the row loop (used for extraction and conversion)
//! - `Writable` - contract for anything the converter can persist
//! - `BatchWriter` - per-table buffered upserts
//! - `ConvertStats` - counters returned by a run
//!
//! # Guarantees
//!
//! - At most one cursor page is held in memory.
//! - The cursor is owned by the converter and released on every exit path.
//! - The first failing row aborts the run; nothing is silently skipped.
//! - Cancellation is observed before every row.
//! - Output tables are cleared of the batch's previous rows before the
//!   first write, so reruns replace rather than append.

mod writer;

pub use writer::BatchWriter;

use crate::error::{Error, Result};
use crate::lineage::{LineageTracker, RawDataBatch, RawDataSubTaskArgs};
use crate::store::{RowCursor, Store, StoredRow};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Default number of buffered rows per table before a flush
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Anything the converter can persist
pub trait Writable {
    /// Table the record is stored in
    fn table(&self) -> &'static str;

    /// Primary key within that table
    fn primary_key(&self) -> String;

    /// Payload stored for the record
    fn to_value(&self) -> Result<Value>;
}

/// Counters from one converter run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertStats {
    /// Input rows read from the cursor
    pub rows_read: usize,
    /// Output records written
    pub records_written: usize,
    /// Output records per table
    pub per_table: BTreeMap<String, usize>,
    /// Rows of the batch removed per table before writing
    pub cleared: BTreeMap<String, usize>,
}

type ConvertFn<'a, I, O> = Box<dyn FnMut(&I) -> Result<Vec<O>> + 'a>;

/// Streaming row converter
///
/// `I` is the input row shape (deserialized from the stored payload),
/// `O` the output record type.
pub struct DataConverter<'a, I, O> {
    store: &'a dyn Store,
    batch: RawDataBatch,
    input: RowCursor<'a>,
    convert: ConvertFn<'a, I, O>,
    outputs: Vec<String>,
    batch_size: usize,
    cancel: CancellationToken,
    _input: PhantomData<fn() -> I>,
}

impl<'a, I, O> DataConverter<'a, I, O>
where
    I: DeserializeOwned,
    O: Writable,
{
    /// Create a converter over `input`, writing under `raw`'s batch
    pub fn new<F>(
        store: &'a dyn Store,
        raw: &RawDataSubTaskArgs,
        input: RowCursor<'a>,
        convert: F,
    ) -> Self
    where
        F: FnMut(&I) -> Result<Vec<O>> + 'a,
    {
        Self {
            store,
            batch: raw.batch(),
            input,
            convert: Box::new(convert),
            outputs: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: CancellationToken::new(),
            _input: PhantomData,
        }
    }

    /// Declare output tables to clear before the first row
    ///
    /// Tables not declared here are cleared lazily on their first write.
    #[must_use]
    pub fn with_outputs<S: Into<String>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.outputs = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-table flush size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Observe a cancellation token between rows
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the conversion to completion
    pub fn execute(self) -> Result<ConvertStats> {
        let Self {
            store,
            batch,
            input,
            mut convert,
            outputs,
            batch_size,
            cancel,
            ..
        } = self;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut tracker = LineageTracker::new(store, batch);
        for table in &outputs {
            tracker.clear(table)?;
        }

        let mut writer = BatchWriter::new(store, batch_size);
        let mut stats = ConvertStats::default();

        for row in input {
            if cancel.is_cancelled() {
                tracing::warn!(rows_read = stats.rows_read, "conversion cancelled");
                return Err(Error::Cancelled);
            }

            let row = row?;
            stats.rows_read += 1;

            let parsed: I = serde_json::from_value(row.data.clone())
                .map_err(|e| Error::transform(&row.id, e.to_string()))?;
            let records = convert(&parsed).map_err(|e| {
                tracing::warn!(row = %row.id, error = %e, "row conversion failed");
                e
            })?;

            for record in records {
                let table = record.table();
                tracker.clear(table)?;
                writer.push(
                    table,
                    StoredRow {
                        id: record.primary_key(),
                        connection_id: row.connection_id,
                        scope_id: row.scope_id.clone(),
                        origin: tracker.origin_for(&row.origin),
                        data: record.to_value()?,
                    },
                )?;
                stats.records_written += 1;
                *stats.per_table.entry(table.to_string()).or_default() += 1;
            }
        }

        writer.flush_all()?;
        stats.cleared = tracker.cleared().clone();

        tracing::debug!(
            rows_read = stats.rows_read,
            records_written = stats.records_written,
            flushes = writer.flushes(),
            "conversion finished"
        );
        Ok(stats)
    }
}
