//! CLI parse: clap types for grant-sweep. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Grant Sweep CLI - strip sharing grants from a storage tree, resumably
#[derive(Parser)]
#[command(name = "grant-sweep")]
#[command(about = "Resumable, time-bounded removal of sharing grants across a storage tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where config/ lives)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root folder id (overrides sweep.root_id)
    #[arg(long)]
    pub root: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one time-bounded invocation: start a sweep or resume the current one
    Start {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Keep invoking until the sweep completes, honouring resume delays
    Run {
        /// Stop after this many invocations even if work remains
        #[arg(long)]
        max_invocations: Option<u32>,
    },
    /// Discard all checkpoint state and pending resume triggers
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show queue lengths and processed counts of the current sweep
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List pending resume triggers
    Triggers {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML
    Config,
}
