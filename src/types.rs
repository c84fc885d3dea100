//! Common types used throughout Solidafy Convert
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Identifier of one configured source instance
pub type ConnectionId = u64;

// ============================================================================
// Domain Types
// ============================================================================

/// Area of the unified schema a subtask contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainType {
    /// Source code repositories and commits
    Code,
    /// Issues and boards
    Ticket,
    /// Merge/pull requests and reviews
    CodeReview,
    /// Pipelines, jobs and deployments
    Cicd,
    /// Entities linking several areas
    Cross,
}

impl DomainType {
    /// Upper-case tag used in configuration and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainType::Code => "CODE",
            DomainType::Ticket => "TICKET",
            DomainType::CodeReview => "CODE_REVIEW",
            DomainType::Cicd => "CICD",
            DomainType::Cross => "CROSS",
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
