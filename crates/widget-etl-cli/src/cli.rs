//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use widget_etl_core::Stage;

/// Batch ETL for widget activity feeds
#[derive(Parser, Debug)]
#[command(name = "widget-etl")]
#[command(version)]
#[command(about = "Batch ETL for widget activity feeds")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Custom database path
    #[arg(long, global = true, env = "WIDGET_ETL_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true, env = "WIDGET_ETL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Debug logging
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// Minimal text output
    Minimal,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline and write both tables
    Run {
        /// JSONL input file
        data_path: Option<PathBuf>,

        /// Do not run the data-quality gate
        #[arg(long)]
        skip_quality: bool,

        /// Write a CSV snapshot after every stage
        #[arg(long)]
        snapshots: bool,

        /// Folder for snapshots
        #[arg(long)]
        staging_dir: Option<PathBuf>,

        /// Start from a snapshot file instead of the raw feed
        #[arg(long, requires = "after")]
        resume: Option<PathBuf>,

        /// Stage that produced the snapshot (deduplicated, ranked, flattened, widget_info)
        #[arg(long, requires = "resume")]
        after: Option<Stage>,
    },

    /// Check the raw feed against the data-quality rules
    Validate {
        /// JSONL input file
        data_path: Option<PathBuf>,
    },

    /// Show the top-scoring user of each age group
    TopUsers {
        /// JSONL input file
        data_path: Option<PathBuf>,
    },

    /// Build the location index without writing it
    Index {
        /// JSONL input file
        data_path: Option<PathBuf>,
    },

    /// Show database tables and the last run
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_resume() {
        let cli = Cli::try_parse_from([
            "widget-etl",
            "run",
            "--resume",
            "data/staging/ranked.csv",
            "--after",
            "ranked",
        ])
        .unwrap();

        match cli.command {
            Command::Run { resume, after, .. } => {
                assert_eq!(resume, Some(PathBuf::from("data/staging/ranked.csv")));
                assert_eq!(after, Some(Stage::Ranked));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_resume_requires_stage() {
        assert!(Cli::try_parse_from(["widget-etl", "run", "--resume", "x.csv"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["widget-etl", "status", "--format", "json", "-v"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(cli.verbose);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["widget-etl", "status", "-v", "-q"]).is_err());
    }
}
