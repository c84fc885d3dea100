//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Convert CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-convert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Task configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// DuckDB database file (in-memory when omitted)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available plugins and their subtasks
    List,

    /// Show the execution plan for the task
    Plan,

    /// Import raw API payloads (JSON lines) as the task's raw batch
    Import {
        /// Raw table to load (e.g. _raw_gitlab_api_deployments)
        #[arg(short, long)]
        table: String,

        /// JSON lines file, one payload per line
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run the task's subtasks
    Run {
        /// Subtasks to enable (comma-separated)
        #[arg(long)]
        enable: Option<String>,

        /// Subtasks to disable (comma-separated)
        #[arg(long)]
        disable: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_flags() {
        let cli = Cli::parse_from([
            "solidafy-convert",
            "--config",
            "task.yaml",
            "run",
            "--disable",
            "ConvertProject,ExtractProject",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("task.yaml")));
        assert!(cli.database.is_none());
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Run { enable, disable } => {
                assert!(enable.is_none());
                assert_eq!(disable.as_deref(), Some("ConvertProject,ExtractProject"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_import_with_global_flags_after() {
        let cli = Cli::parse_from([
            "solidafy-convert",
            "import",
            "-t",
            "_raw_gitlab_api_projects",
            "-i",
            "projects.jsonl",
            "--database",
            "lake.duckdb",
            "--format",
            "pretty",
        ]);
        assert_eq!(cli.database, Some(PathBuf::from("lake.duckdb")));
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(matches!(cli.command, Commands::Import { ref table, .. } if table == "_raw_gitlab_api_projects"));
    }
}
