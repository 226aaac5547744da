//! CLI command implementations
//!
//! `demo` writes a human-readable walkthrough to stdout. `run` serves one
//! JSON request per stdin line and answers each on stdout; logs go to
//! stderr so the two streams never mix.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{ConfigError, StoreConfig};
use crate::lambda::{LambdaResult, LambdaTable};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::table::{Table, Timestamp};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response};

/// One JSON-lines request, tagged by `op`.
///
/// ```text
/// {"op":"push_bulk","key":"rowA","value":"v1"}
/// {"op":"push_realtime","key":"rowA","value":"v2","ts":1700000000000}
/// {"op":"combine","key":"rowA"}
/// {"op":"cleanup"}
/// {"op":"dump"}
/// {"op":"metrics"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    PushBulk {
        key: String,
        value: String,
        #[serde(default)]
        ts: Option<u64>,
    },
    PushRealtime {
        key: String,
        value: String,
        #[serde(default)]
        ts: Option<u64>,
    },
    Combine {
        key: String,
    },
    Cleanup,
    Dump,
    Metrics,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::PushBulk { .. } => "push_bulk",
            Request::PushRealtime { .. } => "push_realtime",
            Request::Combine { .. } => "combine",
            Request::Cleanup => "cleanup",
            Request::Dump => "dump",
            Request::Metrics => "metrics",
        }
    }
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let log_level = cli
        .log_level
        .as_deref()
        .map(|level| level.parse::<Severity>().map_err(ConfigError::Invalid))
        .transpose()?;
    run_command(cli.command, log_level)
}

/// Run a command. `log_level` overrides the configured level.
pub fn run_command(cmd: Command, log_level: Option<Severity>) -> CliResult<()> {
    match cmd {
        Command::Demo => {
            if let Some(severity) = log_level {
                Logger::set_threshold(severity);
            }
            demo(&mut io::stdout().lock())
        }
        Command::Run { config } => {
            let config = match config {
                Some(path) => StoreConfig::load(&path)?,
                None => StoreConfig::lambda_default(),
            };
            let severity = match log_level {
                Some(severity) => severity,
                None => config.severity()?,
            };
            Logger::set_threshold(severity);
            log_event_with_fields(Event::ConfigLoaded, &[("table", &config.table_name)]);

            let lambda = LambdaTable::new(Arc::new(Table::with_config(&config)))?;
            let stdin = io::stdin();
            serve(&lambda, stdin.lock(), &mut io::stdout().lock())
        }
    }
}

/// Replay the reconciliation walkthrough on a fresh table.
///
/// Each step prints a title followed by the table dump after the step.
pub fn demo<W: Write>(out: &mut W) -> CliResult<()> {
    let lambda = LambdaTable::in_memory();

    writeln!(out, "Simplified Lambda Example")?;
    writeln!(out, "=========================")?;

    demo_step(out, &lambda, "Initial table:", |_| Ok(()))?;

    demo_step(out, &lambda, "Push bulk rows:", |lambda| {
        for key in ["rowA", "rowB", "rowC"] {
            lambda.push_bulk(key, "bulk")?;
        }
        lambda.cleanup().map(drop)
    })?;

    demo_step(out, &lambda, "Override rows A,B with realtime:", |lambda| {
        lambda.push_realtime("rowA", "rtOvrd")?;
        lambda.push_realtime("rowB", "rtOvrd")
    })?;

    demo_step(out, &lambda, "Clean table:", |lambda| {
        lambda.cleanup().map(drop)
    })?;

    demo_step(out, &lambda, "Override rows B,C with realtime:", |lambda| {
        lambda.push_realtime("rowB", "rtOvrd2")?;
        lambda.push_realtime("rowC", "rtOvrd2")
    })?;

    demo_step(out, &lambda, "Override all rows with bulk:", |lambda| {
        lambda.push_bulk("rowA", "bulkOvr")?;
        lambda.push_bulk("rowB", "bulkOvr")?;
        lambda.cleanup().map(drop)
    })?;

    out.flush()?;
    Ok(())
}

fn demo_step<W, F>(out: &mut W, lambda: &LambdaTable, title: &str, action: F) -> CliResult<()>
where
    W: Write,
    F: FnOnce(&LambdaTable) -> LambdaResult<()>,
{
    writeln!(out, "\n{}", title)?;
    action(lambda)?;
    write!(out, "{}", lambda.dump_table()?)?;
    Ok(())
}

/// Serve JSON-lines requests until `input` is exhausted.
///
/// A request that fails is answered with an error line and the session
/// continues. Only I/O failures end it early.
pub fn serve<R: BufRead, W: Write>(lambda: &LambdaTable, input: R, out: &mut W) -> CliResult<()> {
    for line in read_requests(input) {
        let request = line.and_then(|value| Ok(serde_json::from_value::<Request>(value)?));

        let outcome = request.and_then(|request| {
            let name = request.name();
            let data = handle(lambda, request)?;
            log_event_with_fields(Event::CommandExecuted, &[("op", name)]);
            Ok(data)
        });

        match outcome {
            Ok(data) => write_response(out, data)?,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log_event_with_fields(
                    Event::CommandRejected,
                    &[("code", err.code()), ("error", &err.to_string())],
                );
                write_error(out, err.code(), &err.to_string())?;
            }
        }
    }
    Ok(())
}

fn handle(lambda: &LambdaTable, request: Request) -> CliResult<Value> {
    let data = match request {
        Request::PushBulk { key, value, ts } => {
            match ts {
                Some(ts) => lambda.push_bulk_at(&key, &value, Timestamp::new(ts))?,
                None => lambda.push_bulk(&key, &value)?,
            }
            json!({ "key": key })
        }
        Request::PushRealtime { key, value, ts } => {
            match ts {
                Some(ts) => lambda.push_realtime_at(&key, &value, Timestamp::new(ts))?,
                None => lambda.push_realtime(&key, &value)?,
            }
            json!({ "key": key })
        }
        Request::Combine { key } => {
            let value = lambda.combine(&key)?;
            json!({ "key": key, "value": value })
        }
        Request::Cleanup => serde_json::to_value(lambda.cleanup()?)?,
        Request::Dump => json!({ "table": lambda.dump_table()? }),
        Request::Metrics => serde_json::to_value(lambda.metrics().snapshot())?,
    };
    Ok(data)
}
