//! Raw data lineage
//!
//! Every tool-layer and domain-layer row remembers the raw ingestion batch it
//! was derived from. The batch, a `(source table, params fingerprint)` pair,
//! is the unit of re-conversion: before a subtask writes, rows previously
//! written for the same batch are cleared, so a rerun replaces instead of
//! appending.
//!
//! # Overview
//!
//! The lineage module provides:
//! - `RawDataSubTaskArgs` - raw table + params a subtask reads/writes under
//! - `RawDataBatch` - the re-conversion unit
//! - `RawDataOrigin` - lineage columns stored on each row
//! - `LineageTracker` - clears each output table once per run

mod tracker;
mod types;

pub use tracker::LineageTracker;
pub use types::{RawDataBatch, RawDataOrigin, RawDataSubTaskArgs};
