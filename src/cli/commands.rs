//! CLI commands and argument parsing

use crate::types::SyncMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MongoDB source connector CLI
#[derive(Parser, Debug)]
#[command(name = "mongodb-source")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test the connection to the database
    Check {
        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,
    },

    /// Discover collections and their schemas
    Discover {
        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,

        /// Documents to sample per collection (overrides the config)
        #[arg(long)]
        sample: Option<u32>,
    },

    /// List collection names (lightweight, no sampling)
    Streams {
        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,
    },

    /// Read records from collections
    Read {
        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,

        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,

        /// Sync mode
        #[arg(long, default_value = "full-refresh")]
        sync_mode: SyncModeArg,

        /// Cursor field for incremental mode
        #[arg(long)]
        cursor_field: Option<String>,

        /// Checkpoint to resume from
        #[arg(long)]
        cursor: Option<String>,

        /// Maximum records per stream
        #[arg(long)]
        max_records: Option<usize>,
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

/// Sync mode as a CLI argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SyncModeArg {
    /// Read every document
    FullRefresh,
    /// Read documents past the cursor checkpoint
    Incremental,
}

impl From<SyncModeArg> for SyncMode {
    fn from(mode: SyncModeArg) -> Self {
        match mode {
            SyncModeArg::FullRefresh => SyncMode::FullRefresh,
            SyncModeArg::Incremental => SyncMode::Incremental,
        }
    }
}
