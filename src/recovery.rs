//! Operator-triggered component recovery
//!
//! The manager delegates the actual recovery action to a
//! [`ComponentRecovery`] hook so hosts can plug in whatever "restart" or
//! "redirect traffic" means for them. The stock hook,
//! [`AcknowledgeRecovery`], records the request and reports success.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core_resilience::RecoveryStrategy;

/// Recovery action hook
#[async_trait]
pub trait ComponentRecovery: Send + Sync {
    /// Recover `component` using `strategy`; `Err` carries the reason
    async fn recover(
        &self,
        component: &str,
        strategy: RecoveryStrategy,
    ) -> std::result::Result<(), String>;
}

/// Hook that accepts every recovery request
#[derive(Debug, Clone, Copy, Default)]
pub struct AcknowledgeRecovery;

#[async_trait]
impl ComponentRecovery for AcknowledgeRecovery {
    async fn recover(
        &self,
        component: &str,
        strategy: RecoveryStrategy,
    ) -> std::result::Result<(), String> {
        tracing::debug!(component, %strategy, "recovery acknowledged");
        Ok(())
    }
}

/// Outcome of [`FaultToleranceManager::recover_component`](crate::FaultToleranceManager::recover_component)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub component: String,
    pub strategy: RecoveryStrategy,
    pub successful: bool,
    pub actions_taken: Vec<String>,
    pub escalation_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecoveryReport {
    pub fn succeeded(component: &str, strategy: RecoveryStrategy) -> Self {
        Self {
            component: component.to_string(),
            strategy,
            successful: true,
            actions_taken: recovery_actions(component, strategy),
            escalation_required: false,
            error: None,
        }
    }

    pub fn failed(component: &str, strategy: RecoveryStrategy, error: String) -> Self {
        Self {
            component: component.to_string(),
            strategy,
            successful: false,
            actions_taken: Vec::new(),
            escalation_required: true,
            error: Some(error),
        }
    }
}

/// Actions a recovery with `strategy` performs on `component`
pub fn recovery_actions(component: &str, strategy: RecoveryStrategy) -> Vec<String> {
    match strategy {
        RecoveryStrategy::Restart => vec![
            format!("Restarting {}", component),
            "Verifying dependencies".to_string(),
            "Restoring previous state".to_string(),
            "Validating functionality".to_string(),
        ],
        RecoveryStrategy::Fallback => vec![
            format!("Activating fallback for {}", component),
            "Redirecting traffic".to_string(),
            "Monitoring performance".to_string(),
        ],
        RecoveryStrategy::GracefulDegradation => vec![
            format!("Applying degradation to {}", component),
            "Limiting functionality".to_string(),
            "Keeping essential services".to_string(),
        ],
        _ => vec!["Generic recovery action".to_string()],
    }
}

/// Parse an operator-supplied strategy name, defaulting to restart
pub fn parse_strategy_or_restart(name: &str) -> RecoveryStrategy {
    name.parse().unwrap_or_else(|_| {
        tracing::warn!(strategy = name, "unknown recovery strategy, using restart");
        RecoveryStrategy::Restart
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acknowledge_always_succeeds() {
        let hook = AcknowledgeRecovery;
        for strategy in RecoveryStrategy::ALL {
            assert!(hook.recover("anything", strategy).await.is_ok());
        }
    }

    #[test]
    fn test_action_lists() {
        let restart = recovery_actions("indexer", RecoveryStrategy::Restart);
        assert_eq!(restart.len(), 4);
        assert_eq!(restart[0], "Restarting indexer");

        assert_eq!(recovery_actions("x", RecoveryStrategy::Fallback).len(), 3);
        assert_eq!(
            recovery_actions("x", RecoveryStrategy::GracefulDegradation).len(),
            3
        );
        assert_eq!(
            recovery_actions("x", RecoveryStrategy::Escalate),
            vec!["Generic recovery action"]
        );
    }

    #[test]
    fn test_unknown_strategy_defaults_to_restart() {
        assert_eq!(parse_strategy_or_restart("reboot"), RecoveryStrategy::Restart);
        assert_eq!(
            parse_strategy_or_restart("fallback"),
            RecoveryStrategy::Fallback
        );
    }

    #[test]
    fn test_failed_report_requires_escalation() {
        let report = RecoveryReport::failed(
            "indexer",
            RecoveryStrategy::Restart,
            "automatic recovery failed".to_string(),
        );
        assert!(!report.successful);
        assert!(report.escalation_required);
        assert!(report.actions_taken.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "restart");
        assert_eq!(json["error"], "automatic recovery failed");
    }
}
