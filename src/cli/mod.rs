//! CLI module for lambdastore
//!
//! Provides the command-line interface for:
//! - demo: Replay the reconciliation walkthrough
//! - run: Serve JSON-lines commands against an in-memory table

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{demo, run, run_command, serve, Request};
pub use errors::{CliError, CliResult};
pub use io::{read_requests, write_error, write_response};
