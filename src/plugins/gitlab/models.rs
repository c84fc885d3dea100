//! GitLab API payloads and tool-layer models

use crate::convert::Writable;
use crate::didgen::EntityKind;
use crate::error::Result;
use crate::types::ConnectionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RAW_PROJECT_TABLE: &str = "_raw_gitlab_api_projects";
pub const RAW_DEPLOYMENT_TABLE: &str = "_raw_gitlab_api_deployments";
pub const TOOL_PROJECT_TABLE: &str = "_tool_gitlab_projects";
pub const TOOL_DEPLOYMENT_TABLE: &str = "_tool_gitlab_deployments";

/// Params every GitLab raw batch is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GitlabApiParams {
    pub connection_id: ConnectionId,
    pub project_id: u64,
}

// ============================================================================
// API Payloads
// ============================================================================

/// `GET /projects/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// `GET /projects/:id/deployments`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDeployment {
    pub id: u64,
    #[serde(default)]
    pub iid: u64,
    #[serde(rename = "ref", default)]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub environment: Option<ApiEnvironment>,
    #[serde(default)]
    pub deployable: Option<ApiDeployable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvironment {
    pub name: String,
}

/// Job that performed a deployment
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDeployable {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Seconds, fractional
    pub duration: Option<f64>,
}

// ============================================================================
// Tool Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitlabProject {
    pub connection_id: ConnectionId,
    pub gitlab_id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub description: String,
    pub web_url: String,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl EntityKind for GitlabProject {
    const PLUGIN: &'static str = "gitlab";
    const ENTITY: &'static str = "GitlabProject";
}

impl Writable for GitlabProject {
    fn table(&self) -> &'static str {
        TOOL_PROJECT_TABLE
    }

    fn primary_key(&self) -> String {
        tool_key(self.connection_id, self.gitlab_id)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl GitlabProject {
    pub fn from_api(connection_id: ConnectionId, api: &ApiProject) -> Self {
        Self {
            connection_id,
            gitlab_id: api.id,
            name: api.name.clone(),
            path_with_namespace: api.path_with_namespace.clone(),
            description: api.description.clone().unwrap_or_default(),
            web_url: api.web_url.clone(),
            created_date: api.created_at,
            updated_date: api.last_activity_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitlabDeployment {
    pub connection_id: ConnectionId,
    /// Project the deployment belongs to
    pub gitlab_id: u64,
    pub deployment_id: u64,
    pub iid: u64,
    pub name: String,
    pub ref_name: String,
    pub sha: String,
    pub status: String,
    pub environment: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
    pub deployable_id: Option<u64>,
    pub deployable_status: String,
    pub deployable_created_at: Option<DateTime<Utc>>,
    pub deployable_started_at: Option<DateTime<Utc>>,
    pub deployable_finished_at: Option<DateTime<Utc>>,
    pub deployable_duration: Option<f64>,
}

impl EntityKind for GitlabDeployment {
    const PLUGIN: &'static str = "gitlab";
    const ENTITY: &'static str = "GitlabDeployment";
}

impl Writable for GitlabDeployment {
    fn table(&self) -> &'static str {
        TOOL_DEPLOYMENT_TABLE
    }

    fn primary_key(&self) -> String {
        format!(
            "{}:{:020}",
            tool_key(self.connection_id, self.gitlab_id),
            self.deployment_id
        )
    }

    fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl GitlabDeployment {
    pub fn from_api(connection_id: ConnectionId, project_id: u64, api: &ApiDeployment) -> Self {
        let deployable = api.deployable.as_ref();
        Self {
            connection_id,
            gitlab_id: project_id,
            deployment_id: api.id,
            iid: api.iid,
            name: deployable.map(|d| d.name.clone()).unwrap_or_default(),
            ref_name: api.ref_name.clone(),
            sha: api.sha.clone(),
            status: api.status.clone(),
            environment: api
                .environment
                .as_ref()
                .map(|e| e.name.clone())
                .unwrap_or_default(),
            created_date: api.created_at,
            updated_date: api.updated_at,
            deployable_id: deployable.map(|d| d.id),
            deployable_status: deployable.map(|d| d.status.clone()).unwrap_or_default(),
            deployable_created_at: deployable.and_then(|d| d.created_at),
            deployable_started_at: deployable.and_then(|d| d.started_at),
            deployable_finished_at: deployable.and_then(|d| d.finished_at),
            deployable_duration: deployable.and_then(|d| d.duration),
        }
    }

    /// Deployment duration in whole seconds
    ///
    /// The job's own duration wins unless it is absent or zero; then the
    /// job's finish time minus its start time (or creation time) is used.
    pub fn duration_sec(&self) -> Option<u64> {
        let reported = self
            .deployable_duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d as u64);
        if let Some(secs) = reported.filter(|&s| s > 0) {
            return Some(secs);
        }

        let started = self.deployable_started_at.or(self.deployable_created_at);
        let derived = match (self.deployable_finished_at, started) {
            (Some(finished), Some(started)) => {
                u64::try_from((finished - started).num_seconds()).ok()
            }
            _ => None,
        };
        derived.or(reported)
    }
}

/// Zero-padded so key order follows numeric order
fn tool_key(connection_id: ConnectionId, gitlab_id: u64) -> String {
    format!("{connection_id:020}:{gitlab_id:020}")
}
