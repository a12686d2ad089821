/*!
 * Warden - Fault-tolerance and recovery engine
 *
 * Runs fallible operations for many independent workflow actors and keeps
 * them alive when they fail:
 * - Named recovery policies with exponential backoff
 * - Per-component circuit breakers
 * - Fallback delegation, graceful degradation, restart requests and escalation
 * - Bounded incident log with heuristic failure classification
 * - Aggregate health snapshots and diagnosis
 * - Operator-triggered component recovery and failure drills
 */

pub mod cli_style;
pub mod config;
pub mod drill;
pub mod error;
pub mod health;
pub mod logging;
pub mod manager;
pub mod recovery;
pub mod simulation;
pub mod strategy;

// Re-export commonly used types
pub use config::{LogLevel, WardenConfig};
pub use drill::{RecoveryDrill, Scenario, ScenarioReport};
pub use error::{Result, WardenError};
pub use health::{Diagnosis, HealthReporter, HealthStatus, OverallStatus};
pub use manager::{ExecutionOutcome, FaultToleranceManager, ManagerConfig};
pub use recovery::{AcknowledgeRecovery, ComponentRecovery, RecoveryReport};
pub use simulation::{Severity, SimulationReport};
pub use strategy::{RecoveryOutcome, RecoveryStrategyExecutor};

pub use warden_core_resilience as resilience;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
