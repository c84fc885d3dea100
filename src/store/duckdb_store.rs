//! DuckDB-backed store
//!
//! Every layer table (raw, tool or domain) shares one physical shape: the
//! primary key, connection and scope columns, the lineage columns and the
//! JSON payload. Tables are created on first write.

use super::{validate_table_name, PagedCursor, RowCursor, RowFilter, Store, StoredRow};
use super::DEFAULT_PAGE_SIZE;
use crate::error::{Error, Result};
use crate::lineage::{RawDataBatch, RawDataOrigin};
use duckdb::types::Value as DuckValue;
use duckdb::{params, params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Store persisting tables in a DuckDB database
pub struct DuckDbStore {
    /// DuckDB connection
    conn: Mutex<Connection>,
    /// Database file (None = in-memory)
    path: Option<PathBuf>,
    /// Tables known to exist
    known_tables: Mutex<BTreeSet<String>>,
    /// Cursor page size
    page_size: usize,
}

/// Columns of one row as read from DuckDB
struct RawColumns {
    id: String,
    connection_id: i64,
    scope_id: String,
    raw_data_table: String,
    raw_data_params: String,
    raw_data_id: i64,
    raw_data_remark: String,
    data: String,
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl DuckDbStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| {
            Error::storage(format!("Failed to open DuckDB at '{}': {e}", path.display()))
        })?;
        Ok(Self::with_connection(conn, Some(path)))
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to create DuckDB connection: {e}")))?;
        Ok(Self::with_connection(conn, None))
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Self {
        Self {
            conn: Mutex::new(conn),
            path,
            known_tables: Mutex::new(BTreeSet::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the cursor page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Database file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a table exists
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        if self.known().contains(table) {
            return Ok(true);
        }
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            params![table],
            |row| row.get(0),
        )?;
        if count > 0 {
            self.known().insert(table.to_string());
        }
        Ok(count > 0)
    }

    fn ensure_table(&self, conn: &Connection, table: &str) -> Result<()> {
        if self.known().contains(table) {
            return Ok(());
        }
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id VARCHAR PRIMARY KEY,
                connection_id BIGINT NOT NULL,
                scope_id VARCHAR NOT NULL,
                raw_data_table VARCHAR NOT NULL,
                raw_data_params VARCHAR NOT NULL,
                raw_data_id BIGINT NOT NULL,
                raw_data_remark VARCHAR NOT NULL,
                data VARCHAR NOT NULL
            );"
        );
        conn.execute_batch(&ddl)?;
        tracing::debug!(table, "created table");
        self.known().insert(table.to_string());
        Ok(())
    }

    fn fetch_page(
        &self,
        table: &str,
        filter: &RowFilter,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredRow>> {
        let mut clauses = Vec::new();
        let mut values: Vec<DuckValue> = Vec::new();

        if let Some(connection_id) = filter.connection_id {
            clauses.push("connection_id = ?");
            values.push(DuckValue::BigInt(to_i64(connection_id, "connection_id")?));
        }
        if let Some(scope_id) = &filter.scope_id {
            clauses.push("scope_id = ?");
            values.push(DuckValue::Text(scope_id.clone()));
        }
        if let Some(batch) = &filter.lineage {
            clauses.push("raw_data_table = ?");
            values.push(DuckValue::Text(batch.source_table.clone()));
            clauses.push("raw_data_params = ?");
            values.push(DuckValue::Text(batch.params_fingerprint.clone()));
        }
        if let Some(after) = after {
            clauses.push("id > ?");
            values.push(DuckValue::Text(after.to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT id, connection_id, scope_id, raw_data_table, raw_data_params, \
             raw_data_id, raw_data_remark, data FROM \"{table}\"{where_sql} ORDER BY id LIMIT {limit}"
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let columns = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(RawColumns {
                    id: row.get(0)?,
                    connection_id: row.get(1)?,
                    scope_id: row.get(2)?,
                    raw_data_table: row.get(3)?,
                    raw_data_params: row.get(4)?,
                    raw_data_id: row.get(5)?,
                    raw_data_remark: row.get(6)?,
                    data: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        columns.into_iter().map(into_stored_row).collect()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("DuckDB connection lock poisoned"))
    }

    fn known(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        // the set only caches existence checks; a poisoned one is still valid
        self.known_tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Store for DuckDbStore {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn cursor<'a>(&'a self, table: &str, filter: &RowFilter) -> Result<RowCursor<'a>> {
        validate_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(Box::new(std::iter::empty()));
        }
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
        if rows.is_empty() {
            return Ok(());
        }

        // last write wins for keys repeated inside one batch
        let mut deduped: BTreeMap<&str, &StoredRow> = BTreeMap::new();
        for row in rows {
            deduped.insert(row.id.as_str(), row);
        }

        let mut conn = self.lock()?;
        self.ensure_table(&conn, table)?;

        let sql = format!(
            "INSERT OR REPLACE INTO \"{table}\" (id, connection_id, scope_id, raw_data_table, \
             raw_data_params, raw_data_id, raw_data_remark, data) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        );
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in deduped.values() {
                let data = serde_json::to_string(&row.data)?;
                stmt.execute(params![
                    row.id,
                    to_i64(row.connection_id, "connection_id")?,
                    row.scope_id,
                    row.origin.raw_data_table,
                    row.origin.raw_data_params,
                    to_i64(row.origin.raw_data_id, "raw_data_id")?,
                    row.origin.raw_data_remark,
                    data,
                ])?;
            }
        }
        tx.commit()?;

        tracing::trace!(table, rows = deduped.len(), "upserted rows");
        Ok(())
    }

    fn delete_lineage(&self, table: &str, batch: &RawDataBatch) -> Result<usize> {
        validate_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let conn = self.lock()?;
        let deleted = conn.execute(
            &format!(
                "DELETE FROM \"{table}\" WHERE raw_data_table = ? AND raw_data_params = ?"
            ),
            params![batch.source_table, batch.params_fingerprint],
        )?;
        Ok(deleted)
    }
}

fn into_stored_row(columns: RawColumns) -> Result<StoredRow> {
    Ok(StoredRow {
        connection_id: to_u64(columns.connection_id, "connection_id")?,
        scope_id: columns.scope_id,
        origin: RawDataOrigin {
            raw_data_table: columns.raw_data_table,
            raw_data_params: columns.raw_data_params,
            raw_data_id: to_u64(columns.raw_data_id, "raw_data_id")?,
            raw_data_remark: columns.raw_data_remark,
        },
        data: serde_json::from_str(&columns.data)?,
        id: columns.id,
    })
}

fn to_i64(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::storage(format!("{column} {value} exceeds BIGINT range")))
}

fn to_u64(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::storage(format!("negative {column}: {value}")))
}
