//! Storage collaborator
//!
//! Conversion reads tool-layer rows through a forward-only cursor and writes
//! domain-layer rows through batched upserts. Both go through the [`Store`]
//! trait so the converter never depends on a particular engine.
//!
//! # Overview
//!
//! The store module provides:
//! - `Store` - cursor / upsert / lineage-delete contract
//! - `StoredRow` - one persisted row with its lineage columns
//! - `RowFilter` - connection, scope and lineage filter
//! - `MemoryStore` - in-process engine for tests and dry runs
//! - `DuckDbStore` - DuckDB-backed engine (file or in-memory)

mod duckdb_store;
mod memory;

pub use duckdb_store::DuckDbStore;
pub use memory::MemoryStore;

use crate::error::{Error, Result};
use crate::lineage::{RawDataBatch, RawDataOrigin};
use crate::types::ConnectionId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::LazyLock;

/// Rows fetched per cursor page
pub const DEFAULT_PAGE_SIZE: usize = 256;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Reject table names that are not plain identifiers
pub fn validate_table_name(table: &str) -> Result<()> {
    if TABLE_NAME.is_match(table) {
        Ok(())
    } else {
        Err(Error::storage(format!("invalid table name '{table}'")))
    }
}

// ============================================================================
// Rows and Filters
// ============================================================================

/// One persisted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    /// Primary key within its table
    pub id: String,
    /// Connection the row belongs to
    pub connection_id: ConnectionId,
    /// Scope (project, repo, board...) the row belongs to
    pub scope_id: String,
    /// Lineage back to the raw batch
    pub origin: RawDataOrigin,
    /// Row payload
    pub data: Value,
}

/// Filter applied by cursors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Only rows of this connection
    pub connection_id: Option<ConnectionId>,
    /// Only rows of this scope
    pub scope_id: Option<String>,
    /// Only rows of this batch
    pub lineage: Option<RawDataBatch>,
}

impl RowFilter {
    /// Create a filter matching every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a connection
    #[must_use]
    pub fn connection(mut self, connection_id: ConnectionId) -> Self {
        self.connection_id = Some(connection_id);
        self
    }

    /// Restrict to a scope
    #[must_use]
    pub fn scope(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_id = Some(scope_id.into());
        self
    }

    /// Restrict to a raw batch
    #[must_use]
    pub fn lineage(mut self, batch: RawDataBatch) -> Self {
        self.lineage = Some(batch);
        self
    }

    /// Whether a row passes the filter
    pub fn matches(&self, row: &StoredRow) -> bool {
        self.connection_id.map_or(true, |c| row.connection_id == c)
            && self.scope_id.as_ref().map_or(true, |s| &row.scope_id == s)
            && self.lineage.as_ref().map_or(true, |b| row.origin.is_in(b))
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Forward-only row iterator; dropping it releases the cursor
pub type RowCursor<'a> = Box<dyn Iterator<Item = Result<StoredRow>> + 'a>;

/// Persistence engine used by extraction and conversion
pub trait Store: Send + Sync {
    /// Engine name for logging
    fn name(&self) -> &'static str;

    /// Open a cursor over `table`, ordered by primary key
    ///
    /// A table that does not exist yields no rows.
    fn cursor<'a>(&'a self, table: &str, filter: &RowFilter) -> Result<RowCursor<'a>>;

    /// Insert rows, replacing rows with the same primary key
    fn upsert(&self, table: &str, rows: &[StoredRow]) -> Result<()>;

    /// Delete every row of `table` written for `batch`, returning the count
    fn delete_lineage(&self, table: &str, batch: &RawDataBatch) -> Result<usize>;

    /// First row matching the filter
    fn first(&self, table: &str, filter: &RowFilter) -> Result<Option<StoredRow>> {
        self.cursor(table, filter)?.next().transpose()
    }

    /// Number of rows matching the filter
    fn count(&self, table: &str, filter: &RowFilter) -> Result<usize> {
        let mut count = 0;
        for row in self.cursor(table, filter)? {
            row?;
            count += 1;
        }
        Ok(count)
    }
}

// ============================================================================
// Paged Cursor
// ============================================================================

/// Keyset-paged cursor shared by the engines
///
/// `fetch(after, limit)` returns up to `limit` rows with a primary key
/// greater than `after`, in key order. At most one page is held in memory.
pub(crate) struct PagedCursor<F> {
    table: String,
    fetch: F,
    page_size: usize,
    page: VecDeque<StoredRow>,
    last_id: Option<String>,
    exhausted: bool,
    rows_read: usize,
}

impl<F> PagedCursor<F>
where
    F: FnMut(Option<&str>, usize) -> Result<Vec<StoredRow>>,
{
    pub(crate) fn new(table: &str, page_size: usize, fetch: F) -> Self {
        tracing::debug!(table, "cursor opened");
        Self {
            table: table.to_string(),
            fetch,
            page_size: page_size.max(1),
            page: VecDeque::new(),
            last_id: None,
            exhausted: false,
            rows_read: 0,
        }
    }
}

impl<F> Iterator for PagedCursor<F>
where
    F: FnMut(Option<&str>, usize) -> Result<Vec<StoredRow>>,
{
    type Item = Result<StoredRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.exhausted {
            match (self.fetch)(self.last_id.as_deref(), self.page_size) {
                Ok(rows) => {
                    self.exhausted = rows.len() < self.page_size;
                    self.page.extend(rows);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }

        let row = self.page.pop_front()?;
        self.last_id = Some(row.id.clone());
        self.rows_read += 1;
        Some(Ok(row))
    }
}

impl<F> Drop for PagedCursor<F> {
    fn drop(&mut self) {
        tracing::debug!(
            table = %self.table,
            rows_read = self.rows_read,
            "cursor released"
        );
    }
}
