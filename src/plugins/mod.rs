//! Plugins
//!
//! Every plugin is listed in [`registry`]; there is no self-registration.
//! A plugin owns a fixed subtask table and turns a [`TaskConfig`] into the
//! task data its subtasks read.
//!
//! # Overview
//!
//! The plugins module provides:
//! - `Plugin` - object-safe contract used by the CLI
//! - `registry` / `find_plugin` - the explicit plugin table
//! - `import_raw` - load raw API payloads as one raw batch
//! - `gitlab` - reference plugin (projects and deployments)

pub mod gitlab;

use crate::config::TaskConfig;
use crate::error::{Error, Result};
use crate::lineage::{RawDataOrigin, RawDataSubTaskArgs};
use crate::store::{Store, StoredRow};
use crate::subtask::{PlannedSubTask, RunReport};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// A source plugin
pub trait Plugin: Send + Sync {
    /// Name used in task configs (e.g. "gitlab")
    fn name(&self) -> &'static str;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Raw tables the plugin's extractors read
    fn raw_tables(&self) -> &'static [&'static str];

    /// Raw batch that rows of `table` belong to for this task
    fn raw_args(&self, config: &TaskConfig, table: &str) -> Result<RawDataSubTaskArgs>;

    /// Execution plan for this task
    fn plan(&self, config: &TaskConfig) -> Result<Vec<PlannedSubTask>>;

    /// Run the plugin's subtasks for this task
    fn run(
        &self,
        store: &dyn Store,
        config: &TaskConfig,
        cancel: &CancellationToken,
    ) -> Result<RunReport>;
}

/// Summary of a registered plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub raw_tables: Vec<&'static str>,
    pub subtasks: Vec<PlannedSubTask>,
}

/// Every available plugin
pub fn registry() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(gitlab::Gitlab)]
}

/// Look a plugin up by name
pub fn find_plugin(name: &str) -> Result<Box<dyn Plugin>> {
    registry()
        .into_iter()
        .find(|p| p.name() == name)
        .ok_or_else(|| {
            let known: Vec<&str> = registry().iter().map(|p| p.name()).collect();
            Error::invalid_value(
                "plugin",
                format!("unknown plugin '{name}'. Available: {}", known.join(", ")),
            )
        })
}

/// Describe every registered plugin with its default plan
pub fn list_plugins() -> Result<Vec<PluginInfo>> {
    registry()
        .iter()
        .map(|p| {
            let config = TaskConfig::new(p.name(), 1, "0");
            Ok(PluginInfo {
                name: p.name(),
                description: p.description(),
                raw_tables: p.raw_tables().to_vec(),
                subtasks: p.plan(&config)?,
            })
        })
        .collect()
}

/// Store raw payloads as the task's batch for `table`
///
/// Replaces whatever the batch held before. Rows are numbered by their
/// position, starting at 1; the number is the raw id every derived row points
/// back to. Keys carry the batch fingerprint so batches of other connections
/// or scopes sharing the table are never overwritten.
pub fn import_raw(
    store: &dyn Store,
    plugin: &dyn Plugin,
    config: &TaskConfig,
    table: &str,
    payloads: impl IntoIterator<Item = Value>,
) -> Result<usize> {
    if !plugin.raw_tables().contains(&table) {
        return Err(Error::invalid_value(
            "table",
            format!(
                "'{table}' is not a raw table of plugin '{}'. Expected one of: {}",
                plugin.name(),
                plugin.raw_tables().join(", ")
            ),
        ));
    }

    let raw = plugin.raw_args(config, table)?;
    let batch = raw.batch();
    let deleted = store.delete_lineage(table, &batch)?;

    let rows: Vec<StoredRow> = payloads
        .into_iter()
        .enumerate()
        .map(|(i, data)| {
            let seq = i as u64 + 1;
            StoredRow {
                id: format!("{}:{seq:020}", batch.params_fingerprint),
                connection_id: config.connection_id,
                scope_id: config.project_id.clone(),
                origin: RawDataOrigin::new(&batch, seq),
                data,
            }
        })
        .collect();

    for chunk in rows.chunks(config.batch_size.max(1)) {
        store.upsert(table, chunk)?;
    }

    tracing::info!(
        table,
        params = %batch.params_fingerprint,
        replaced = deleted,
        imported = rows.len(),
        "raw batch imported"
    );
    Ok(rows.len())
}
