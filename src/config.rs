//! Store configuration
//!
//! A JSON file describing one table:
//!
//! ```json
//! {
//!   "table_name": "lambdaTable",
//!   "families": ["f"],
//!   "max_versions": 1,
//!   "simulated_latency_ms": 0,
//!   "latency_jitter_ms": 0,
//!   "log_level": "info"
//! }
//! ```
//!
//! Only `families` is required. Unknown keys are rejected.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lambda::FAMILY;
use crate::observability::Severity;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "LS_CONFIG_READ",
            ConfigError::Parse(_) => "LS_CONFIG_PARSE",
            ConfigError::Invalid(_) => "LS_CONFIG_INVALID",
        }
    }
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Table name, used in logs
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Column families declared at creation
    pub families: Vec<String>,

    /// Versions returned per column when a read does not ask (default 1)
    #[serde(default = "default_max_versions")]
    pub max_versions: usize,

    /// Delay added to every table call, in milliseconds (default 0)
    #[serde(default)]
    pub simulated_latency_ms: u64,

    /// Upper bound of random extra delay, in milliseconds (default 0)
    #[serde(default)]
    pub latency_jitter_ms: u64,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_table_name() -> String {
    "lambdaTable".to_string()
}
fn default_max_versions() -> usize {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}

impl StoreConfig {
    /// Configuration with the given families and defaults elsewhere
    pub fn new<I, S>(table_name: impl Into<String>, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table_name: table_name.into(),
            families: families.into_iter().map(Into::into).collect(),
            max_versions: default_max_versions(),
            simulated_latency_ms: 0,
            latency_jitter_ms: 0,
            log_level: default_log_level(),
        }
    }

    /// Table laid out for realtime/bulk reconciliation
    pub fn lambda_default() -> Self {
        let family = String::from_utf8_lossy(FAMILY).into_owned();
        Self::new(default_table_name(), [family])
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: StoreConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::Invalid("table_name must not be empty".into()));
        }

        if self.families.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one column family is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for family in &self.families {
            if family.is_empty() {
                return Err(ConfigError::Invalid("family names must not be empty".into()));
            }
            if !seen.insert(family.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "family '{}' declared twice",
                    family
                )));
            }
        }

        if self.max_versions == 0 {
            return Err(ConfigError::Invalid("max_versions must be > 0".into()));
        }

        self.severity()?;

        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse::<Severity>().map_err(ConfigError::Invalid)
    }

    /// Fixed part of the simulated latency
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    /// Random part of the simulated latency, upper bound
    pub fn latency_jitter(&self) -> Duration {
        Duration::from_millis(self.latency_jitter_ms)
    }

    // Builder-style setters

    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions;
        self
    }

    pub fn with_simulated_latency(mut self, latency_ms: u64, jitter_ms: u64) -> Self {
        self.simulated_latency_ms = latency_ms;
        self.latency_jitter_ms = jitter_ms;
        self
    }

    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::lambda_default()
    }
}
