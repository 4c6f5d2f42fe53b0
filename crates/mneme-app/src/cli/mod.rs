pub mod validators;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "mneme",
    version,
    author,
    about = "Archived-snapshot ingestion for the RAG index"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn print_help() {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
    }
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Push archived snapshots from blob storage into the RAG index.
    Sync(SyncArgs),
    /// Probe blob storage and indexer connectivity.
    Check(CheckArgs),
}

/// Which snapshot collection to process.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    Qast,
    Stock,
    All,
}

/// Push archived snapshots into the index.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Snapshot collection to process.
    #[arg(long, value_enum, default_value_t = SourceArg::All)]
    pub source: SourceArg,
    /// Discover snapshots without submitting anything.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,
    /// Number of snapshots submitted concurrently per group.
    #[arg(long, value_parser = validators::validate_concurrency)]
    pub concurrency: Option<usize>,
    /// Milliseconds staggering downloads inside a group.
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,
    /// Per-attempt submission timeout in milliseconds.
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,
    /// Total submission attempts per snapshot (>= 1).
    #[arg(long, value_parser = validators::validate_retries)]
    pub max_retries: Option<usize>,
    /// Consecutive submission timeouts tolerated before the run aborts.
    #[arg(long)]
    pub max_consecutive_timeouts: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CheckArgs;
