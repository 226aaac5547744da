//! lambdastore - an in-memory, multi-version column store with
//! realtime/bulk reconciliation on top.
//!
//! - `table`: versioned rows, families, point and range reads
//! - `filter`: server-side row and cell filtering
//! - `lambda`: combine and cleanup over the BULK and REALTIME columns
//! - `observability`: JSON logging, counters, lifecycle events
//! - `config`: JSON configuration
//! - `cli`: the `lambdastore` binary

pub mod cli;
pub mod config;
pub mod filter;
pub mod lambda;
pub mod observability;
pub mod table;
