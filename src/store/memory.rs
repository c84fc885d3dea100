//! In-memory store
//!
//! Tables are ordered maps keyed by primary key, so cursors page through
//! them in key order exactly like the SQL engine does.

use super::{validate_table_name, PagedCursor, RowCursor, RowFilter, Store, StoredRow};
use super::DEFAULT_PAGE_SIZE;
use crate::error::{Error, Result};
use crate::lineage::RawDataBatch;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

type Table = BTreeMap<String, StoredRow>;

/// Store keeping every table in process memory
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the cursor page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Names of all tables holding at least one row
    pub fn tables(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn fetch_page(
        &self,
        table: &str,
        filter: &RowFilter,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredRow>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let lower = after.map_or(Bound::Unbounded, |id| Bound::Excluded(id.to_string()));
        Ok(rows
            .range((lower, Bound::Unbounded))
            .map(|(_, row)| row)
            .filter(|row| filter.matches(row))
            .take(limit)
            .cloned()
            .collect())
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn cursor<'a>(&'a self, table: &str, filter: &RowFilter) -> Result<RowCursor<'a>> {
        validate_table_name(table)?;
        let table_name = table.to_string();
        let filter = filter.clone();
        Ok(Box::new(PagedCursor::new(
            table,
            self.page_size,
            move |after, limit| self.fetch_page(&table_name, &filter, after, limit),
        )))
    }

    fn upsert(&self, table: &str, rows: &[StoredRow]) -> Result<()> {
        validate_table_name(table)?;
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let entries = tables.entry(table.to_string()).or_default();
        for row in rows {
            entries.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }

    fn delete_lineage(&self, table: &str, batch: &RawDataBatch) -> Result<usize> {
        validate_table_name(table)?;
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|_, row| !row.origin.is_in(batch));
        Ok(before - rows.len())
    }
}

fn poisoned() -> Error {
    Error::storage("memory store lock poisoned")
}
