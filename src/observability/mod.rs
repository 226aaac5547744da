//! Observability: structured logging, counters and lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only; it never changes an operation's outcome
//! 2. No async or background threads
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use lambdastore::observability::{log_event_with_fields, Event, Logger};
//!
//! Logger::info("TABLE_CREATED", &[("table", "lambda")]);
//! log_event_with_fields(Event::AnomalyDetected, &[("row", "rowA")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Severity an event is logged at
pub fn event_severity(event: Event) -> Severity {
    match event {
        Event::AnomalyDetected | Event::UnknownFamilyRejected | Event::CommandRejected => {
            Severity::Warn
        }
        Event::CleanupRowFailed => Severity::Error,
        Event::RowPromoted | Event::RealtimeDiscarded | Event::RowRemoved => Severity::Trace,
        _ => Severity::Info,
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(event_severity(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event_severity(event), event.as_str(), fields);
}
