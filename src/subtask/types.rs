//! SubTask types
//!
//! Metadata, execution context and run reports for plugin subtasks.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::DomainType;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Entry point of a subtask
pub type EntryPoint<D> = fn(&SubTaskContext<'_, D>) -> Result<()>;

/// Static description of one subtask
///
/// `D` is the plugin's task data, shared by all of its subtasks.
pub struct SubTaskMeta<D> {
    /// Unique name within the plugin
    pub name: &'static str,
    /// Function run when the subtask executes
    pub entry_point: EntryPoint<D>,
    /// Whether the subtask runs when the config does not mention it
    pub enabled_by_default: bool,
    /// One-line description
    pub description: &'static str,
    /// Areas of the domain schema the subtask writes
    pub domain_types: &'static [DomainType],
    /// Names of subtasks that must succeed first
    pub dependencies: &'static [&'static str],
}

impl<D> Clone for SubTaskMeta<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for SubTaskMeta<D> {}

impl<D> fmt::Debug for SubTaskMeta<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubTaskMeta")
            .field("name", &self.name)
            .field("enabled_by_default", &self.enabled_by_default)
            .field("domain_types", &self.domain_types)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Everything a running subtask can reach
pub struct SubTaskContext<'a, D> {
    /// Plugin name
    pub plugin: &'a str,
    /// Name of the running subtask
    pub subtask: &'static str,
    /// Shared storage
    pub store: &'a dyn Store,
    /// Plugin task data
    pub data: &'a D,
    /// Run-level abort signal
    pub cancel: &'a CancellationToken,
}

impl<D> SubTaskContext<'_, D> {
    /// Fail with [`Error::Cancelled`] once the run is aborted
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// States and Reports
// ============================================================================

/// Lifecycle state of a subtask within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Disabled by configuration
    Skipped,
}

impl SubTaskState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for SubTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One entry of an execution plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSubTask {
    pub name: String,
    pub enabled: bool,
    pub dependencies: Vec<String>,
    pub domain_types: Vec<DomainType>,
}

/// Final state of one subtask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTaskOutcome {
    pub name: String,
    pub state: SubTaskState,
    /// Whether the entry point was called
    pub executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Outcomes of one plugin run, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub plugin: String,
    pub outcomes: Vec<SubTaskOutcome>,
}

impl RunReport {
    /// Whether no subtask failed
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.state != SubTaskState::Failed)
    }

    /// Outcome of a named subtask
    pub fn get(&self, name: &str) -> Option<&SubTaskOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &SubTaskOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == SubTaskState::Failed)
    }

    /// Turn the first failure into an error
    pub fn into_result(self) -> Result<Self> {
        if let Some(failed) = self.failures().next() {
            return Err(Error::SubTaskFailed {
                name: failed.name.clone(),
                message: failed.error.clone().unwrap_or_default(),
            });
        }
        Ok(self)
    }
}
