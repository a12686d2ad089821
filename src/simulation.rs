//! Synthetic failures for drills
//!
//! Simulation registers a real incident with a canned message and applies
//! the default policy's terminal strategy, so health reports and breakers
//! see drills the same way they see production failures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use warden_core_resilience::FailureKind;

use crate::error::WardenError;
use crate::strategy::RecoveryOutcome;

/// Declared severity of a simulated failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(WardenError::Config(format!("unknown severity '{}'", other))),
        }
    }
}

/// Canned error message for a simulated failure of `kind`
pub fn simulated_message(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Timeout => "Connection timeout after 30 seconds",
        FailureKind::ApiError => "API returned HTTP 500 Internal Server Error",
        FailureKind::NetworkError => "Network unreachable",
        FailureKind::MemoryError => "Out of memory error",
        FailureKind::AgentFailure => "Agent processing failed",
        _ => "Generic failure",
    }
}

/// Result of one simulated failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub incident_id: String,
    pub kind: FailureKind,
    pub component: String,
    pub severity: Severity,
    pub message: String,
    pub recovery: RecoveryOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_messages_classify_back_to_kind() {
        use warden_core_resilience::classify_message;

        for kind in [
            FailureKind::Timeout,
            FailureKind::ApiError,
            FailureKind::NetworkError,
            FailureKind::MemoryError,
            FailureKind::AgentFailure,
        ] {
            assert_eq!(classify_message(simulated_message(kind)), kind);
        }
    }

    #[test]
    fn test_unlisted_kinds_are_generic() {
        assert_eq!(simulated_message(FailureKind::CheckpointFailure), "Generic failure");
        assert_eq!(simulated_message(FailureKind::ResourceExhaustion), "Generic failure");
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(Severity::default(), Severity::Medium);
        assert!("catastrophic".parse::<Severity>().is_err());
    }
}
