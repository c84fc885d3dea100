//! Domain layer
//!
//! The unified, source-independent record shapes produced by conversion.
//! The set of shapes is closed: a conversion emits [`DomainRecord`] values
//! and the output kind of each one decides the table it lands in.

mod devops;

pub use devops::{CicdDeployment, CicdDeploymentCommit, CicdScope};

use crate::convert::Writable;
use crate::didgen::DomainId;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Tag of a domain record shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    CicdScope,
    CicdDeploymentCommit,
    CicdDeployment,
}

impl OutputKind {
    /// Every output kind
    pub const ALL: [OutputKind; 3] = [
        OutputKind::CicdScope,
        OutputKind::CicdDeploymentCommit,
        OutputKind::CicdDeployment,
    ];

    /// Table the kind is stored in
    pub fn table(&self) -> &'static str {
        match self {
            OutputKind::CicdScope => "cicd_scopes",
            OutputKind::CicdDeploymentCommit => "cicd_deployment_commits",
            OutputKind::CicdDeployment => "cicd_deployments",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// One domain-layer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum DomainRecord {
    CicdScope(CicdScope),
    CicdDeploymentCommit(CicdDeploymentCommit),
    CicdDeployment(CicdDeployment),
}

impl DomainRecord {
    /// Shape tag
    pub fn kind(&self) -> OutputKind {
        match self {
            DomainRecord::CicdScope(_) => OutputKind::CicdScope,
            DomainRecord::CicdDeploymentCommit(_) => OutputKind::CicdDeploymentCommit,
            DomainRecord::CicdDeployment(_) => OutputKind::CicdDeployment,
        }
    }

    /// Domain id of the record
    pub fn id(&self) -> &DomainId {
        match self {
            DomainRecord::CicdScope(r) => &r.id,
            DomainRecord::CicdDeploymentCommit(r) => &r.id,
            DomainRecord::CicdDeployment(r) => &r.id,
        }
    }
}

impl Writable for DomainRecord {
    fn table(&self) -> &'static str {
        self.kind().table()
    }

    fn primary_key(&self) -> String {
        self.id().to_string()
    }

    /// Only the shape's own fields are stored; the table carries the tag
    fn to_value(&self) -> Result<Value> {
        let value = match self {
            DomainRecord::CicdScope(r) => serde_json::to_value(r)?,
            DomainRecord::CicdDeploymentCommit(r) => serde_json::to_value(r)?,
            DomainRecord::CicdDeployment(r) => serde_json::to_value(r)?,
        };
        Ok(value)
    }
}

impl From<CicdScope> for DomainRecord {
    fn from(record: CicdScope) -> Self {
        DomainRecord::CicdScope(record)
    }
}

impl From<CicdDeploymentCommit> for DomainRecord {
    fn from(record: CicdDeploymentCommit) -> Self {
        DomainRecord::CicdDeploymentCommit(record)
    }
}

impl From<CicdDeployment> for DomainRecord {
    fn from(record: CicdDeployment) -> Self {
        DomainRecord::CicdDeployment(record)
    }
}
