//! Task configuration
//!
//! A task file names the plugin to run, the connection and scope it runs
//! for, and the knobs the plugin's subtasks read: enable flags, the
//! environment enrichment table and classification rule overrides.
//!
//! ```yaml
//! plugin: gitlab
//! connection_id: 1
//! project_id: 12345
//! subtasks:
//!   ConvertProject: false
//! environment:
//!   allow: ["^production$"]
//!   rules:
//!     - pattern: "(?i)^prod"
//!       name: production
//! batch_size: 500
//! ```

use crate::enrich::{EnrichmentDef, EnrichmentTable};
use crate::error::{Error, Result, ResultExt};
use crate::rules::{ResultRule, StatusRule};
use crate::types::ConnectionId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// Task Config
// ============================================================================

/// One plugin run for one connection and scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Plugin name (e.g., "gitlab")
    pub plugin: String,

    /// Source instance the rows belong to
    pub connection_id: ConnectionId,

    /// Scope identifier, numeric or text
    #[serde(deserialize_with = "scope_id")]
    pub project_id: String,

    /// Enable flags overriding each subtask's default
    #[serde(default)]
    pub subtasks: BTreeMap<String, bool>,

    /// Enrichment table for deployment environments
    #[serde(default)]
    pub environment: Option<EnrichmentDef>,

    /// Replacement result classification table
    #[serde(default)]
    pub result_rule: Option<ResultRule>,

    /// Replacement status classification table
    #[serde(default)]
    pub status_rule: Option<StatusRule>,

    /// Rows buffered per table before a write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    crate::convert::DEFAULT_BATCH_SIZE
}

fn scope_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

impl TaskConfig {
    /// Minimal config for a plugin, connection and scope
    pub fn new(
        plugin: impl Into<String>,
        connection_id: ConnectionId,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            connection_id,
            project_id: project_id.into(),
            subtasks: BTreeMap::new(),
            environment: None,
            result_rule: None,
            status_rule: None,
            batch_size: default_batch_size(),
        }
    }

    /// Set an enable flag
    #[must_use]
    pub fn with_subtask(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.subtasks.insert(name.into(), enabled);
        self
    }

    /// Set the environment enrichment table
    #[must_use]
    pub fn with_environment(mut self, def: EnrichmentDef) -> Self {
        self.environment = Some(def);
        self
    }

    /// Compile the environment enrichment table, if configured
    pub fn environment_table(&self) -> Result<Option<EnrichmentTable>> {
        self.environment
            .as_ref()
            .map(EnrichmentTable::from_def)
            .transpose()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a task config file
pub fn load_task_config(path: impl AsRef<Path>) -> Result<TaskConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read task config '{}'", path.display()))?;
    load_task_config_from_str(&content)
}

/// Parse and validate a task config from YAML (or JSON)
pub fn load_task_config_from_str(yaml: &str) -> Result<TaskConfig> {
    let config: TaskConfig = serde_yaml::from_str(yaml)?;
    validate_task_config(&config)?;
    Ok(config)
}

fn validate_task_config(config: &TaskConfig) -> Result<()> {
    if config.plugin.trim().is_empty() {
        return Err(Error::missing_field("plugin"));
    }

    if config.connection_id == 0 {
        return Err(Error::invalid_value(
            "connection_id",
            "must be a positive integer",
        ));
    }

    if config.project_id.trim().is_empty() {
        return Err(Error::missing_field("project_id"));
    }

    if config.batch_size == 0 {
        return Err(Error::invalid_value("batch_size", "must be at least 1"));
    }

    config.environment_table()?;
    Ok(())
}
