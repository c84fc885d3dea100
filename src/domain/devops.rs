//! CI/CD domain shapes

use crate::didgen::DomainId;
use crate::rules::{CicdResult, CicdStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A CI/CD scope (project, repository, pipeline owner)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CicdScope {
    pub id: DomainId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
}

/// A deployment of one commit to one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CicdDeploymentCommit {
    pub id: DomainId,
    pub cicd_scope_id: DomainId,
    pub cicd_deployment_id: DomainId,
    pub name: String,
    pub result: CicdResult,
    pub status: CicdStatus,
    pub original_status: String,
    pub environment: String,
    pub original_environment: String,
    pub created_date: Option<DateTime<Utc>>,
    pub started_date: Option<DateTime<Utc>>,
    pub finished_date: Option<DateTime<Utc>>,
    pub duration_sec: Option<u64>,
    pub commit_sha: String,
    pub ref_name: String,
    pub repo_id: DomainId,
    pub repo_url: String,
}

/// A deployment, independent of the commits it shipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CicdDeployment {
    pub id: DomainId,
    pub cicd_scope_id: DomainId,
    pub name: String,
    pub result: CicdResult,
    pub status: CicdStatus,
    pub original_status: String,
    pub environment: String,
    pub original_environment: String,
    pub created_date: Option<DateTime<Utc>>,
    pub started_date: Option<DateTime<Utc>>,
    pub finished_date: Option<DateTime<Utc>>,
    pub duration_sec: Option<u64>,
}

impl CicdDeploymentCommit {
    /// Denormalized deployment view of this record
    ///
    /// Sources where one deployment ships exactly one commit emit both.
    pub fn to_deployment(&self) -> CicdDeployment {
        CicdDeployment {
            id: self.cicd_deployment_id.clone(),
            cicd_scope_id: self.cicd_scope_id.clone(),
            name: self.name.clone(),
            result: self.result.clone(),
            status: self.status.clone(),
            original_status: self.original_status.clone(),
            environment: self.environment.clone(),
            original_environment: self.original_environment.clone(),
            created_date: self.created_date,
            started_date: self.started_date,
            finished_date: self.finished_date,
            duration_sec: self.duration_sec,
        }
    }
}
