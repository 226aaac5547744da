//! CLI argument definitions using clap
//!
//! Commands:
//! - lambdastore demo
//! - lambdastore run [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lambdastore - versioned column store with realtime/bulk reconciliation
#[derive(Parser, Debug)]
#[command(name = "lambdastore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Override the log level (trace, info, warn, error, fatal)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the reconciliation walkthrough on a fresh table
    Demo,

    /// Serve JSON-lines commands from stdin
    Run {
        /// Path to configuration file; the default layout is used if omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
