//! Canonical CI/CD values and their rule tables
//!
//! `ResultRule` and `StatusRule` are plain data (they deserialize from task
//! configuration) and are turned into a [`ClassificationRule`] with a fixed
//! category order when used.

use super::ClassificationRule;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Canonical Values
// ============================================================================

/// Outcome of a pipeline, job or deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CicdResult {
    /// Finished unsuccessfully
    Failure,
    /// Finished successfully
    Success,
    /// Cancelled or never executed
    Abort,
    /// Waiting on a human
    Manual,
    /// Native value no category recognized
    Other(String),
}

impl CicdResult {
    /// String stored in the domain layer
    pub fn as_str(&self) -> &str {
        match self {
            CicdResult::Failure => "FAILURE",
            CicdResult::Success => "SUCCESS",
            CicdResult::Abort => "ABORT",
            CicdResult::Manual => "MANUAL",
            CicdResult::Other(raw) => raw,
        }
    }

    /// Whether the value is one of the canonical variants
    pub fn is_canonical(&self) -> bool {
        !matches!(self, CicdResult::Other(_))
    }
}

impl From<String> for CicdResult {
    fn from(value: String) -> Self {
        match value.as_str() {
            "FAILURE" => CicdResult::Failure,
            "SUCCESS" => CicdResult::Success,
            "ABORT" => CicdResult::Abort,
            "MANUAL" => CicdResult::Manual,
            _ => CicdResult::Other(value),
        }
    }
}

impl From<CicdResult> for String {
    fn from(value: CicdResult) -> Self {
        match value {
            CicdResult::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CicdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<&str> for CicdResult {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Lifecycle state of a pipeline, job or deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CicdStatus {
    /// No longer running
    Done,
    /// Currently running
    InProgress,
    /// Queued or created
    NotStarted,
    /// Blocked on a human
    Manual,
    /// Native value no category recognized
    Other(String),
}

impl CicdStatus {
    /// String stored in the domain layer
    pub fn as_str(&self) -> &str {
        match self {
            CicdStatus::Done => "DONE",
            CicdStatus::InProgress => "IN_PROGRESS",
            CicdStatus::NotStarted => "NOT_STARTED",
            CicdStatus::Manual => "MANUAL",
            CicdStatus::Other(raw) => raw,
        }
    }

    /// Whether the value is one of the canonical variants
    pub fn is_canonical(&self) -> bool {
        !matches!(self, CicdStatus::Other(_))
    }
}

impl From<String> for CicdStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DONE" => CicdStatus::Done,
            "IN_PROGRESS" => CicdStatus::InProgress,
            "NOT_STARTED" => CicdStatus::NotStarted,
            "MANUAL" => CicdStatus::Manual,
            _ => CicdStatus::Other(value),
        }
    }
}

impl From<CicdStatus> for String {
    fn from(value: CicdStatus) -> Self {
        match value {
            CicdStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CicdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<&str> for CicdStatus {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// ============================================================================
// Rule Tables
// ============================================================================

/// Native values per result category
///
/// Categories are evaluated as Failed, Success, Abort, Manual.
/// A missing `default` means the native value itself is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRule {
    #[serde(default)]
    pub failed: Vec<String>,
    #[serde(default)]
    pub success: Vec<String>,
    #[serde(default)]
    pub abort: Vec<String>,
    #[serde(default)]
    pub manual: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
}

impl ResultRule {
    /// Build the ordered rule for one native value
    pub fn to_rule(&self, native: &str) -> ClassificationRule<CicdResult> {
        let default = match &self.default {
            Some(label) => CicdResult::from(label.clone()),
            None => CicdResult::Other(native.to_string()),
        };
        ClassificationRule::new(default)
            .category(CicdResult::Failure, self.failed.iter().cloned())
            .category(CicdResult::Success, self.success.iter().cloned())
            .category(CicdResult::Abort, self.abort.iter().cloned())
            .category(CicdResult::Manual, self.manual.iter().cloned())
    }
}

/// Native values per status category
///
/// Categories are evaluated as Done, InProgress, NotStarted, Manual.
/// A missing `default` means the native value itself is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRule {
    #[serde(default)]
    pub done: Vec<String>,
    #[serde(default)]
    pub in_progress: Vec<String>,
    #[serde(default)]
    pub not_started: Vec<String>,
    #[serde(default)]
    pub manual: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
}

impl StatusRule {
    /// Build the ordered rule for one native value
    pub fn to_rule(&self, native: &str) -> ClassificationRule<CicdStatus> {
        let default = match &self.default {
            Some(label) => CicdStatus::from(label.clone()),
            None => CicdStatus::Other(native.to_string()),
        };
        ClassificationRule::new(default)
            .category(CicdStatus::Done, self.done.iter().cloned())
            .category(CicdStatus::InProgress, self.in_progress.iter().cloned())
            .category(CicdStatus::NotStarted, self.not_started.iter().cloned())
            .category(CicdStatus::Manual, self.manual.iter().cloned())
    }
}

/// Classify a native result value
pub fn get_result(rule: &ResultRule, native: &str) -> CicdResult {
    rule.to_rule(native).classify(native)
}

/// Classify a native status value
pub fn get_status(rule: &StatusRule, native: &str) -> CicdStatus {
    rule.to_rule(native).classify(native)
}
