//! CLI module
//!
//! Command-line interface for running conversion tasks.
//!
//! # Commands
//!
//! - `list` - List plugins and their subtasks
//! - `plan` - Show the subtask order and enable flags for a task
//! - `import` - Load raw API payloads (JSON lines) as a raw batch
//! - `run` - Run a task's subtasks against the store

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
