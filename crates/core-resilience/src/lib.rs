//! Warden Core Resilience: Pure-logic fault tolerance primitives
//!
//! # Overview
//!
//! This crate provides the building blocks the Warden fault-tolerance
//! manager is assembled from:
//!
//! - **Failure Classifier**: Maps an error message to a [`FailureKind`]
//! - **Recovery Policies**: Named retry/backoff/strategy records with a `default` fallback
//! - **Circuit Breaker**: Fails fast for a component that keeps failing, probes for recovery
//! - **Breaker Registry**: Lazily creates one breaker per component
//! - **Incident Log**: Bounded FIFO record of every caught failure
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - What the wrapped operations do
//! - Where incidents are persisted
//! - How health is presented
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Fault Tolerance Manager           │
//! └──────┬──────────────┬───────────────────┘
//!        │              │
//!        ▼              ▼
//! ┌─────────────┐ ┌─────────────────────────┐
//! │ PolicyTable │ │ BreakerRegistry         │  ← Fail-fast per component
//! │ (by name)   │ │  └─ CircuitBreaker      │
//! └─────────────┘ └─────────────────────────┘
//!        │
//!   On failure:
//!        │
//!        ▼
//! ┌─────────────────────────────────────────┐
//! │  classify() → FailureKind               │
//! │  IncidentLog (bounded ring, FIFO)       │  ← Health reporting input
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use warden_core_resilience::{BreakerRegistry, CircuitBreakerConfig, PolicyTable};
//!
//! # async fn example() {
//! let policies = PolicyTable::reference();
//! let policy = policies.lookup("network");
//!
//! let registry = BreakerRegistry::new();
//! let breaker = registry.get_or_create(
//!     "geo-api",
//!     CircuitBreakerConfig {
//!         failure_threshold: policy.circuit_breaker_threshold,
//!         ..Default::default()
//!     },
//! );
//!
//! let result = breaker.call(|| async { Ok::<_, std::io::Error>("ok") }).await;
//! # let _ = result;
//! # }
//! ```

pub mod circuit_breaker;
pub mod classifier;
pub mod error;
pub mod incident;
pub mod policy;
pub mod registry;

// Re-export main types for convenience
pub use circuit_breaker::{
    BreakerError, BreakerPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerView,
    CircuitState,
};
pub use classifier::{classify, classify_message, FailureKind};
pub use error::ResilienceError;
pub use incident::{
    FailureIncident, IncidentContext, IncidentLog, IncidentLogStats, DEFAULT_INCIDENT_CAPACITY,
};
pub use policy::{PolicyTable, RecoveryPolicy, RecoveryStrategy, DEFAULT_POLICY};
pub use registry::BreakerRegistry;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use warden_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
    pub use super::classifier::{classify, FailureKind};
    pub use super::error::ResilienceError;
    pub use super::incident::{FailureIncident, IncidentContext, IncidentLog};
    pub use super::policy::{PolicyTable, RecoveryPolicy, RecoveryStrategy};
    pub use super::registry::BreakerRegistry;
}
