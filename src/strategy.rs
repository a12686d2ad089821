//! Terminal recovery strategies
//!
//! Once the retry loop is exhausted, [`RecoveryStrategyExecutor::apply`]
//! turns the policy's strategy into a structured [`RecoveryOutcome`].
//! Nothing here runs another operation: a fallback is named, not executed,
//! and an escalation is a value the caller has to act on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core_resilience::{RecoveryPolicy, RecoveryStrategy};

/// Limitations advertised by a degraded component
pub const DEGRADED_LIMITATIONS: [&str; 2] = ["reduced functionality", "limited performance"];

/// Result of applying a terminal recovery strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// Work handed to the policy's fallback target
    Delegated {
        fallback_target: String,
        component: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Component keeps serving with reduced guarantees
    Degraded {
        component: String,
        error: String,
        message: String,
        limitations: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A human has to step in
    Escalated {
        incident_id: String,
        component: String,
        error: String,
        message: String,
        requires_manual_intervention: bool,
        timestamp: DateTime<Utc>,
    },

    /// The host should restart the component
    RestartRequested {
        component: String,
        error: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl RecoveryOutcome {
    pub fn component(&self) -> &str {
        match self {
            RecoveryOutcome::Delegated { component, .. }
            | RecoveryOutcome::Degraded { component, .. }
            | RecoveryOutcome::Escalated { component, .. }
            | RecoveryOutcome::RestartRequested { component, .. } => component,
        }
    }

    pub fn requires_manual_intervention(&self) -> bool {
        matches!(
            self,
            RecoveryOutcome::Escalated {
                requires_manual_intervention: true,
                ..
            }
        )
    }

    /// Short label used in logs and tables
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryOutcome::Delegated { .. } => "delegated",
            RecoveryOutcome::Degraded { .. } => "degraded",
            RecoveryOutcome::Escalated { .. } => "escalated",
            RecoveryOutcome::RestartRequested { .. } => "restart_requested",
        }
    }
}

/// Maps an exhausted policy to its terminal outcome
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryStrategyExecutor;

impl RecoveryStrategyExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Apply the policy's strategy for `component` after `error`
    ///
    /// `Fallback` without a target, `Retry` and `CircuitBreaker` have no
    /// terminal action of their own and degrade gracefully.
    pub fn apply(
        &self,
        policy: &RecoveryPolicy,
        component: &str,
        error: &str,
        incident_id: &str,
    ) -> RecoveryOutcome {
        match (policy.strategy, policy.fallback_target.as_deref()) {
            (RecoveryStrategy::Fallback, Some(target)) => {
                tracing::info!(component, fallback = target, "delegating to fallback target");
                self.delegate(target, component)
            }
            (RecoveryStrategy::Escalate, _) => {
                tracing::info!(component, incident_id, "escalating incident");
                self.escalate(incident_id, component, error)
            }
            (RecoveryStrategy::Restart, _) => {
                tracing::info!(component, "requesting component restart");
                RecoveryOutcome::RestartRequested {
                    component: component.to_string(),
                    error: error.to_string(),
                    message: format!("Restart requested for {}", component),
                    timestamp: Utc::now(),
                }
            }
            (strategy, _) => {
                tracing::info!(component, %strategy, "applying graceful degradation");
                self.degrade(component, error)
            }
        }
    }

    fn delegate(&self, target: &str, component: &str) -> RecoveryOutcome {
        RecoveryOutcome::Delegated {
            fallback_target: target.to_string(),
            component: component.to_string(),
            message: format!("Operation delegated to {} after failure", target),
            timestamp: Utc::now(),
        }
    }

    fn degrade(&self, component: &str, error: &str) -> RecoveryOutcome {
        RecoveryOutcome::Degraded {
            component: component.to_string(),
            error: error.to_string(),
            message: "Service running in degraded mode".to_string(),
            limitations: DEGRADED_LIMITATIONS.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
        }
    }

    fn escalate(&self, incident_id: &str, component: &str, error: &str) -> RecoveryOutcome {
        RecoveryOutcome::Escalated {
            incident_id: incident_id.to_string(),
            component: component.to_string(),
            error: error.to_string(),
            message: "Incident escalated to an operator".to_string(),
            requires_manual_intervention: true,
            timestamp: Utc::now(),
        }
    }
}
