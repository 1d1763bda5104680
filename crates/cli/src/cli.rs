//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// recsync - start-time synchronization for multi-device recordings
#[derive(Parser, Debug)]
#[command(
    name = "recsync",
    author,
    version,
    about = "Start-time synchronization for multi-device recording sessions",
    long_about = "Aligns the wall-clock start times of recordings captured on devices \n\
                  with independent clocks, using hardware tick counters sampled \n\
                  alongside the data. Also validates multi-segment series and \n\
                  inspects recording headers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RECSYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "RECSYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize target start times against a reference recording
    Sync(SyncArgs),

    /// Validate that recording files compose into one series
    Validate(ValidateArgs),

    /// Display recording header information
    Info(InfoArgs),
}

/// Arguments for the `sync` command
#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    /// Reference recording whose wall-clock start is trusted
    #[arg(short, long, env = "RECSYNC_REFERENCE")]
    pub reference: PathBuf,

    /// Target recordings whose start gets corrected
    #[arg(required = true)]
    pub targets: Vec<PathBuf>,

    /// Compute corrections but do not write any file
    #[arg(long)]
    pub dry_run: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RECSYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Recording files to compose, in any order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Recording file to inspect
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show dropped/cropped/blank exclusion detail
    #[arg(long)]
    pub timing: bool,

    /// Show per-channel detail
    #[arg(long)]
    pub channels: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}
