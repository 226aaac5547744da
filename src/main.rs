//! lambdastore CLI entry point
//!
//! Parses arguments and hands off to the CLI module. Errors are printed to
//! stderr with their code and the process exits non-zero.

use lambdastore::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
