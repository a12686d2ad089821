/*!
 * Configuration types for Warden
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use warden_core_resilience::policy::duration_secs;
use warden_core_resilience::{PolicyTable, RecoveryPolicy, DEFAULT_INCIDENT_CAPACITY};

use crate::error::{Result, WardenError};

/// Main configuration for the fault-tolerance manager and CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Maximum incidents retained in memory
    #[serde(default = "default_incident_capacity")]
    pub incident_capacity: usize,

    /// Seconds an open circuit waits after its last failure before probing
    #[serde(
        default = "default_breaker_recovery_timeout",
        with = "duration_secs"
    )]
    pub breaker_recovery_timeout: Duration,

    /// Trailing window used by health reports when none is given
    #[serde(default = "default_health_window")]
    pub health_window_minutes: u32,

    /// Policies overriding or extending the reference table
    #[serde(default)]
    pub policies: BTreeMap<String, RecoveryPolicy>,
}

fn default_incident_capacity() -> usize {
    DEFAULT_INCIDENT_CAPACITY
}

fn default_breaker_recovery_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_health_window() -> u32 {
    60
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            incident_capacity: default_incident_capacity(),
            breaker_recovery_timeout: default_breaker_recovery_timeout(),
            health_window_minutes: default_health_window(),
            policies: BTreeMap::new(),
        }
    }
}

impl WardenConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: WardenConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the configuration, including every policy override
    pub fn validate(&self) -> Result<()> {
        if self.incident_capacity == 0 {
            return Err(WardenError::Config(
                "incident_capacity must be at least 1".to_string(),
            ));
        }

        if self.health_window_minutes == 0 {
            return Err(WardenError::Config(
                "health_window_minutes must be greater than 0".to_string(),
            ));
        }

        for (name, policy) in &self.policies {
            policy.validate(name)?;
        }

        Ok(())
    }

    /// Reference policy table with this configuration's overrides applied
    pub fn policy_table(&self) -> Result<PolicyTable> {
        let mut table = PolicyTable::reference();
        for (name, policy) in &self.policies {
            table.insert(name.clone(), policy.clone())?;
        }
        Ok(table)
    }

    /// Sample configuration listing the reference policies, for `init-config`
    pub fn sample() -> Self {
        let reference = PolicyTable::reference();
        let policies = reference
            .names()
            .into_iter()
            .filter_map(|name| reference.get(name).map(|p| (name.to_string(), p.clone())))
            .collect();

        Self {
            policies,
            ..Default::default()
        }
    }
}

/// Logging level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
