//! SubTask scheduling
//!
//! A plugin is a fixed table of named subtasks (extract, convert, enrich)
//! with dependencies between them. The scheduler orders that table and runs
//! it, tracking each subtask through its lifecycle.
//!
//! # Overview
//!
//! The subtask module provides:
//! - `SubTaskMeta` - static description of one subtask
//! - `SubTaskContext` - what a running subtask can reach
//! - `SubTaskScheduler` - dependency ordering, enable flags and execution
//! - `RunReport` / `SubTaskOutcome` - per-subtask results of one run
//!
//! # Lifecycle
//!
//! ```text
//! Pending -> Running -> Succeeded | Failed
//! Pending -> Skipped               (disabled by configuration)
//! Pending -> Failed                (a dependency did not succeed, or the run was cancelled)
//! ```

mod scheduler;
mod types;

pub use scheduler::SubTaskScheduler;
pub use types::{
    EntryPoint, PlannedSubTask, RunReport, SubTaskContext, SubTaskMeta, SubTaskOutcome,
    SubTaskState,
};

#[cfg(test)]
mod tests;
