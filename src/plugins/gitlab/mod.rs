//! GitLab plugin
//!
//! Extracts projects and deployments from raw API payloads into tool rows,
//! then converts them into CI/CD scopes, deployments and deployment commits.
//!
//! ```text
//! ExtractProject ──> ConvertProject
//!       │
//!       └──────────┐
//! ExtractDeployment ──> ConvertDeployment
//! ```

mod convert;
mod extract;
mod models;

pub use convert::{deployment_to_domain, CONVERT_DEPLOYMENT, CONVERT_PROJECT};
pub use extract::{EXTRACT_DEPLOYMENT, EXTRACT_PROJECT};
pub use models::{
    ApiDeployable, ApiDeployment, ApiEnvironment, ApiProject, GitlabApiParams, GitlabDeployment,
    GitlabProject, RAW_DEPLOYMENT_TABLE, RAW_PROJECT_TABLE, TOOL_DEPLOYMENT_TABLE,
    TOOL_PROJECT_TABLE,
};

use super::Plugin;
use crate::config::TaskConfig;
use crate::enrich::EnrichmentTable;
use crate::error::{Error, Result};
use crate::lineage::RawDataSubTaskArgs;
use crate::rules::{ResultRule, StatusRule};
use crate::store::{RowFilter, Store};
use crate::subtask::{PlannedSubTask, RunReport, SubTaskMeta, SubTaskScheduler};
use tokio_util::sync::CancellationToken;

/// Task data shared by the GitLab subtasks
#[derive(Debug, Clone)]
pub struct GitlabTaskData {
    pub options: GitlabApiParams,
    /// Scope id rows are stored under
    pub scope_id: String,
    pub environment: Option<EnrichmentTable>,
    pub result_rule: ResultRule,
    pub status_rule: StatusRule,
    pub batch_size: usize,
}

impl GitlabTaskData {
    pub fn from_config(config: &TaskConfig) -> Result<Self> {
        let project_id = config.project_id.trim().parse::<u64>().map_err(|_| {
            Error::invalid_value(
                "project_id",
                format!("'{}' is not a numeric GitLab project id", config.project_id),
            )
        })?;

        Ok(Self {
            options: GitlabApiParams {
                connection_id: config.connection_id,
                project_id,
            },
            scope_id: config.project_id.clone(),
            environment: config.environment_table()?,
            result_rule: config.result_rule.clone().unwrap_or_else(default_result_rule),
            status_rule: config.status_rule.clone().unwrap_or_else(default_status_rule),
            batch_size: config.batch_size,
        })
    }

    /// Raw batch args for one of the plugin's raw tables
    pub fn raw_args(&self, table: &str) -> Result<RawDataSubTaskArgs> {
        RawDataSubTaskArgs::new(table, &self.options)
    }

    /// Rows of this connection and project
    pub fn scope_filter(&self) -> RowFilter {
        RowFilter::new()
            .connection(self.options.connection_id)
            .scope(self.scope_id.clone())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Deployment result table
pub fn default_result_rule() -> ResultRule {
    ResultRule {
        failed: strings(&["UNDEPLOYED", "failed"]),
        success: strings(&["COMPLETED", "success"]),
        abort: strings(&["created", "canceled"]),
        manual: strings(&["running", "blocked"]),
        default: None,
    }
}

/// Deployment status table
pub fn default_status_rule() -> StatusRule {
    StatusRule {
        done: strings(&["COMPLETED", "UNDEPLOYED", "failed", "success", "canceled"]),
        in_progress: strings(&["running"]),
        not_started: strings(&["created"]),
        manual: strings(&["blocked"]),
        default: None,
    }
}

/// Subtask table in declaration order
pub fn subtasks() -> Vec<SubTaskMeta<GitlabTaskData>> {
    vec![
        EXTRACT_PROJECT,
        CONVERT_PROJECT,
        EXTRACT_DEPLOYMENT,
        CONVERT_DEPLOYMENT,
    ]
}

/// The GitLab plugin
#[derive(Debug, Clone, Copy, Default)]
pub struct Gitlab;

impl Gitlab {
    fn scheduler(&self) -> Result<SubTaskScheduler<GitlabTaskData>> {
        SubTaskScheduler::new(self.name(), subtasks())
    }
}

impl Plugin for Gitlab {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn description(&self) -> &'static str {
        "GitLab projects and deployments"
    }

    fn raw_tables(&self) -> &'static [&'static str] {
        &[RAW_PROJECT_TABLE, RAW_DEPLOYMENT_TABLE]
    }

    fn raw_args(&self, config: &TaskConfig, table: &str) -> Result<RawDataSubTaskArgs> {
        GitlabTaskData::from_config(config)?.raw_args(table)
    }

    fn plan(&self, config: &TaskConfig) -> Result<Vec<PlannedSubTask>> {
        self.scheduler()?.plan(&config.subtasks)
    }

    fn run(
        &self,
        store: &dyn Store,
        config: &TaskConfig,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let scheduler = self.scheduler()?;
        let data = GitlabTaskData::from_config(config)?;
        tracing::info!(
            connection_id = data.options.connection_id,
            project_id = data.options.project_id,
            store = store.name(),
            "running gitlab task"
        );
        scheduler.run(&config.subtasks, store, &data, cancel)
    }
}
