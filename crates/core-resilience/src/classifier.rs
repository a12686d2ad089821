//! Failure Classifier: heuristic mapping from an error to a [`FailureKind`]
//!
//! Classification lower-cases the error's display text and looks for
//! keywords in a fixed priority order:
//!
//! 1. `timeout` → [`FailureKind::Timeout`]
//! 2. `network` / `connection` → [`FailureKind::NetworkError`]
//! 3. `api` / `http` → [`FailureKind::ApiError`]
//! 4. `memory` → [`FailureKind::MemoryError`]
//! 5. `validation` → [`FailureKind::ValidationError`]
//! 6. anything else → [`FailureKind::AgentFailure`]
//!
//! The kind is informational. It annotates incidents and feeds health
//! reports; it never selects a recovery strategy.
//!
//! # Example
//!
//! ```
//! use warden_core_resilience::classifier::{classify_message, FailureKind};
//!
//! assert_eq!(classify_message("Connection timeout after 30s"), FailureKind::Timeout);
//! assert_eq!(classify_message("HTTP 502 from upstream"), FailureKind::ApiError);
//! ```

use crate::error::ResilienceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ApiError,
    NetworkError,
    ResourceExhaustion,
    ValidationError,
    AgentFailure,
    CheckpointFailure,
    MemoryError,
}

impl FailureKind {
    /// All kinds, in declaration order
    pub const ALL: [FailureKind; 8] = [
        FailureKind::Timeout,
        FailureKind::ApiError,
        FailureKind::NetworkError,
        FailureKind::ResourceExhaustion,
        FailureKind::ValidationError,
        FailureKind::AgentFailure,
        FailureKind::CheckpointFailure,
        FailureKind::MemoryError,
    ];

    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ApiError => "api_error",
            FailureKind::NetworkError => "network_error",
            FailureKind::ResourceExhaustion => "resource_exhaustion",
            FailureKind::ValidationError => "validation_error",
            FailureKind::AgentFailure => "agent_failure",
            FailureKind::CheckpointFailure => "checkpoint_failure",
            FailureKind::MemoryError => "memory_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = ResilienceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        FailureKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ResilienceError::UnknownFailureKind(s.to_string()))
    }
}

/// Keyword table in priority order
const RULES: &[(&[&str], FailureKind)] = &[
    (&["timeout"], FailureKind::Timeout),
    (&["network", "connection"], FailureKind::NetworkError),
    (&["api", "http"], FailureKind::ApiError),
    (&["memory"], FailureKind::MemoryError),
    (&["validation"], FailureKind::ValidationError),
];

/// Classify a raw error message
pub fn classify_message(message: &str) -> FailureKind {
    let lowered = message.to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, kind)| *kind)
        .unwrap_or(FailureKind::AgentFailure)
}

/// Classify any displayable error
pub fn classify<E: fmt::Display + ?Sized>(error: &E) -> FailureKind {
    classify_message(&error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_mapping() {
        assert_eq!(classify_message("request TIMEOUT"), FailureKind::Timeout);
        assert_eq!(classify_message("Network unreachable"), FailureKind::NetworkError);
        assert_eq!(classify_message("connection reset by peer"), FailureKind::NetworkError);
        assert_eq!(classify_message("API quota exceeded"), FailureKind::ApiError);
        assert_eq!(classify_message("http 500"), FailureKind::ApiError);
        assert_eq!(classify_message("Out of memory"), FailureKind::MemoryError);
        assert_eq!(classify_message("validation failed: name"), FailureKind::ValidationError);
    }

    #[test]
    fn test_default_is_agent_failure() {
        assert_eq!(classify_message("something odd"), FailureKind::AgentFailure);
        assert_eq!(classify_message(""), FailureKind::AgentFailure);
    }

    #[test]
    fn test_priority_order() {
        // timeout beats network
        assert_eq!(classify_message("connection timeout"), FailureKind::Timeout);
        // network beats api
        assert_eq!(classify_message("api connection refused"), FailureKind::NetworkError);
        // api beats memory
        assert_eq!(classify_message("http memory limit"), FailureKind::ApiError);
        // memory beats validation
        assert_eq!(classify_message("memory validation"), FailureKind::MemoryError);
    }

    #[test]
    fn test_classify_display_error() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "Connection refused");
        assert_eq!(classify(&err), FailureKind::NetworkError);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("timeout".parse::<FailureKind>().unwrap(), FailureKind::Timeout);
        assert_eq!("api-error".parse::<FailureKind>().unwrap(), FailureKind::ApiError);
        assert_eq!(
            "Checkpoint_Failure".parse::<FailureKind>().unwrap(),
            FailureKind::CheckpointFailure
        );
        assert!("nonsense".parse::<FailureKind>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for kind in FailureKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
