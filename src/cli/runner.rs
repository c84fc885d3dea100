//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_task_config, TaskConfig};
use crate::error::{Error, Result, ResultExt};
use crate::plugins::{find_plugin, import_raw, list_plugins};
use crate::store::{DuckDbStore, MemoryStore, Store};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::List => self.list(),
            Commands::Plan => self.plan(),
            Commands::Import { table, input } => self.import(table, input),
            Commands::Run { enable, disable } => {
                self.run_task(enable.as_deref(), disable.as_deref()).await
            }
        }
    }

    fn load_task(&self) -> Result<TaskConfig> {
        let path = self.cli.config.as_ref().ok_or_else(|| {
            Error::config("No task config provided. Use --config <task.yaml>")
        })?;
        load_task_config(path)
    }

    fn open_store(&self) -> Result<Arc<dyn Store>> {
        match &self.cli.database {
            Some(path) => Ok(Arc::new(DuckDbStore::open(path)?)),
            None => {
                tracing::warn!("no --database given, using a throwaway in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    /// List plugins
    fn list(&self) -> Result<()> {
        self.output_message(&json!({
            "type": "PLUGINS",
            "plugins": list_plugins()?
        }));
        Ok(())
    }

    /// Show the plan for the task config
    fn plan(&self) -> Result<()> {
        let config = self.load_task()?;
        let plugin = find_plugin(&config.plugin)?;
        let subtasks = plugin.plan(&config)?;

        self.output_message(&json!({
            "type": "PLAN",
            "plugin": plugin.name(),
            "connection_id": config.connection_id,
            "project_id": config.project_id,
            "subtasks": subtasks
        }));
        Ok(())
    }

    /// Import raw payloads from a JSON lines file
    fn import(&self, table: &str, input: &Path) -> Result<()> {
        let config = self.load_task()?;
        let plugin = find_plugin(&config.plugin)?;
        let payloads = read_json_lines(input)?;
        let store = self.open_store()?;

        let rows = import_raw(store.as_ref(), plugin.as_ref(), &config, table, payloads)?;
        let params = plugin.raw_args(&config, table)?.fingerprint();

        self.output_message(&json!({
            "type": "IMPORT",
            "table": table,
            "params": params,
            "rows": rows
        }));
        Ok(())
    }

    /// Run the task's subtasks
    ///
    /// The run executes on a blocking thread; Ctrl-C cancels it between rows.
    async fn run_task(&self, enable: Option<&str>, disable: Option<&str>) -> Result<()> {
        let mut config = self.load_task()?;
        apply_flags(&mut config, enable, true);
        apply_flags(&mut config, disable, false);

        let plugin = find_plugin(&config.plugin)?;
        let store = self.open_store()?;
        let cancel = CancellationToken::new();

        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, cancelling run");
                    cancel.cancel();
                }
            })
        };

        let start = Instant::now();
        let task = {
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || plugin.run(store.as_ref(), &config, &cancel))
        };
        let result = task
            .await
            .map_err(|e| Error::Other(format!("run task aborted: {e}")));
        watcher.abort();
        let report = result??;

        self.output_message(&json!({
            "type": "REPORT",
            "plugin": report.plugin,
            "success": report.is_success(),
            "cancelled": cancel.is_cancelled(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "subtasks": report.outcomes
        }));

        report.into_result().map(|_| ())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Insert comma-separated subtask names into the config's enable flags
fn apply_flags(config: &mut TaskConfig, names: Option<&str>, enabled: bool) {
    let Some(names) = names else {
        return;
    };
    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        config.subtasks.insert(name.to_string(), enabled);
    }
}

/// Parse a JSON lines file, skipping blank lines
fn read_json_lines(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file '{}'", path.display()))?;

    let mut payloads = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), n + 1))?;
        payloads.push(value);
    }
    Ok(payloads)
}
