//! Error types for the resilience primitives

use thiserror::Error;

/// Errors that can occur in resilience operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    /// Circuit breaker is open, rejecting requests
    ///
    /// The message is fixed; the component lives in the field only.
    #[error("Circuit breaker is open, rejecting requests")]
    CircuitOpen { component: String },

    /// Circuit breaker is half-open and its single probe call is still running
    #[error("Circuit breaker is half-open with a probe in flight, rejecting requests")]
    ProbeInFlight { component: String },

    /// Policy failed validation
    #[error("Invalid recovery policy '{name}': {reason}")]
    InvalidPolicy { name: String, reason: String },

    /// Strategy name not recognised
    #[error("Unknown recovery strategy: {0}")]
    UnknownStrategy(String),

    /// Failure kind name not recognised
    #[error("Unknown failure kind: {0}")]
    UnknownFailureKind(String),
}

impl ResilienceError {
    /// Check if this error is a breaker rejection (the operation was never run)
    pub fn is_circuit_rejection(&self) -> bool {
        matches!(
            self,
            ResilienceError::CircuitOpen { .. } | ResilienceError::ProbeInFlight { .. }
        )
    }
}
