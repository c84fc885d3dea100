// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Convert
//!
//! Record-conversion engine that turns source-specific tool rows into a
//! unified, source-independent domain schema.
//!
//! ## Features
//!
//! - **Deterministic IDs**: structural, reversible domain ids per entity kind
//! - **Rule-as-data classification**: ordered category tables, first match wins
//! - **Regex enrichment**: collapse vendor spellings onto canonical labels
//! - **Streaming conversion**: cursor-driven, fan-out, batched writes
//! - **Lineage**: every row tagged with its raw batch; reruns replace
//! - **Subtask scheduling**: dependency-ordered, per-subtask outcomes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_convert::config::load_task_config;
//! use solidafy_convert::plugins::find_plugin;
//! use solidafy_convert::store::DuckDbStore;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = load_task_config("task.yaml")?;
//! let store = DuckDbStore::open("lake.duckdb")?;
//! let plugin = find_plugin(&config.plugin)?;
//!
//! let report = plugin.run(&store, &config, &CancellationToken::new())?;
//! assert!(report.is_success());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SubTask Scheduler                            │
//! │  extract ──> convert ──> enrich   (dependency order, flags)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴──────────────────────────────────┐
//! │                    Streaming Converter                          │
//! │  cursor ──> transform (fan-out) ──> batched, lineage-tagged     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │  DidGen  │   Rules   │   Enrich      │  Lineage  │   Store     │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ plugin:  │ Result    │ allow list    │ batch     │ Memory      │
//! │ Entity:  │ Status    │ pattern→name  │ origin    │ DuckDB      │
//! │ conn:id  │ default   │ passthrough   │ clear once│             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Add docs before 1.0 release

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Deterministic domain id generation
pub mod didgen;

/// Classification rule engine
pub mod rules;

/// Regex enrichment tables
pub mod enrich;

/// Raw data lineage
pub mod lineage;

/// Storage contract and engines
pub mod store;

/// Streaming converter and batched writer
pub mod convert;

/// Domain-layer record shapes
pub mod domain;

/// Subtask metadata and scheduler
pub mod subtask;

/// Task configuration
pub mod config;

/// Plugin table and reference plugins
pub mod plugins;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_task_config, load_task_config_from_str, TaskConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
