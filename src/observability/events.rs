//! Observable events
//!
//! Events are explicit and typed; their string forms are stable.

use std::fmt;

/// Observable events of the store and the reconciliation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Table created
    TableCreated,
    /// Column family declared after creation
    FamilyAdded,

    // Store
    /// Write rejected for naming an undeclared family
    UnknownFamilyRejected,
    /// Row removed because its last version went
    RowRemoved,

    // Reconciliation
    /// Realtime value promoted to bulk
    RowPromoted,
    /// Realtime value dropped because bulk was newer
    RealtimeDiscarded,
    /// Bulk timestamp >= realtime timestamp observed
    AnomalyDetected,
    /// A row could not be reconciled; the pass continued
    CleanupRowFailed,

    // CLI
    /// Command processed
    CommandExecuted,
    /// Command rejected
    CommandRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::TableCreated => "TABLE_CREATED",
            Event::FamilyAdded => "FAMILY_ADDED",

            Event::UnknownFamilyRejected => "UNKNOWN_FAMILY_REJECTED",
            Event::RowRemoved => "ROW_REMOVED",

            Event::RowPromoted => "ROW_PROMOTED",
            Event::RealtimeDiscarded => "REALTIME_DISCARDED",
            Event::AnomalyDetected => "ANOMALY_DETECTED",
            Event::CleanupRowFailed => "CLEANUP_ROW_FAILED",

            Event::CommandExecuted => "COMMAND_EXECUTED",
            Event::CommandRejected => "COMMAND_REJECTED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
