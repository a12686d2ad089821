/*!
 * Error types for Warden
 */

use std::fmt;
use std::io;

use warden_core_resilience::ResilienceError;

pub type Result<T> = std::result::Result<T, WardenError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum WardenError {
    /// Configuration error
    Config(String),

    /// I/O error
    Io(io::Error),

    /// Error raised by a resilience primitive
    Resilience(ResilienceError),

    /// The recovery strategy escalated; a human has to step in
    Escalated {
        incident_id: String,
        component: String,
    },

    /// Output serialization failed
    Serialization(String),
}

impl WardenError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WardenError::Config(_)
            | WardenError::Io(_)
            | WardenError::Resilience(_)
            | WardenError::Serialization(_) => EXIT_FATAL,
            WardenError::Escalated { .. } => EXIT_PARTIAL,
        }
    }

    /// Check if this error asks for manual intervention
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(self, WardenError::Escalated { .. })
    }
}

impl fmt::Display for WardenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WardenError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            WardenError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            WardenError::Resilience(err) => {
                write!(f, "{}", err)
            }
            WardenError::Escalated {
                incident_id,
                component,
            } => {
                write!(
                    f,
                    "Incident {} on component '{}' escalated, manual intervention required",
                    incident_id, component
                )
            }
            WardenError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for WardenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WardenError::Io(err) => Some(err),
            WardenError::Resilience(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for WardenError {
    fn from(err: io::Error) -> Self {
        WardenError::Io(err)
    }
}

impl From<ResilienceError> for WardenError {
    fn from(err: ResilienceError) -> Self {
        match err {
            ResilienceError::InvalidPolicy { .. } => WardenError::Config(err.to_string()),
            other => WardenError::Resilience(other),
        }
    }
}

impl From<toml::de::Error> for WardenError {
    fn from(err: toml::de::Error) -> Self {
        WardenError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for WardenError {
    fn from(err: toml::ser::Error) -> Self {
        WardenError::Serialization(format!("TOML serialize error: {}", err))
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        WardenError::Serialization(format!("JSON error: {}", err))
    }
}
