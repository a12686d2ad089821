//! Failure drills
//!
//! A manager starts with an empty incident log and no breakers, and nothing
//! survives the process. The reporting commands therefore seed the manager
//! from a [`Scenario`] in the same run before they report on it.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use warden_core_resilience::{CircuitBreakerView, FailureKind, IncidentContext, RecoveryStrategy};

use crate::manager::{ExecutionOutcome, FaultToleranceManager};
use crate::recovery::RecoveryReport;
use crate::simulation::{simulated_message, Severity, SimulationReport};

/// Failure kind used when a drill opens a breaker
pub const TRIP_FAILURE_KIND: FailureKind = FailureKind::NetworkError;

/// Failures injected before a health report
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// Component the injected failures are attributed to
    pub component: String,

    /// One simulated failure per entry, in order
    pub simulate: Vec<FailureKind>,

    pub severity: Severity,

    /// Open the component's breaker using this policy's threshold
    pub trip_policy: Option<String>,
}

/// What a [`Scenario`] injected
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub simulations: Vec<SimulationReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaker: Option<CircuitBreakerView>,
}

impl Scenario {
    /// True when applying the scenario changes nothing
    pub fn is_empty(&self) -> bool {
        self.simulate.is_empty() && self.trip_policy.is_none()
    }

    pub async fn apply(&self, manager: &FaultToleranceManager) -> ScenarioReport {
        if self.is_empty() {
            tracing::info!("no failures injected; the report reflects an empty manager");
        }

        let simulations = self
            .simulate
            .iter()
            .map(|&kind| manager.simulate_failure(kind, &self.component, self.severity))
            .collect();

        let breaker = match self.trip_policy.as_deref() {
            Some(policy) => Some(
                manager
                    .trip_circuit_breaker(&self.component, policy, TRIP_FAILURE_KIND)
                    .await,
            ),
            None => None,
        };

        ScenarioReport {
            simulations,
            breaker,
        }
    }
}

/// Breaker state around a component recovery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryDrill {
    pub breaker_before: Option<CircuitBreakerView>,
    pub report: RecoveryReport,
    pub breaker_after: Option<CircuitBreakerView>,
}

/// Optionally open the component's breaker, then run its recovery hook
pub async fn recover_component(
    manager: &FaultToleranceManager,
    component: &str,
    strategy: RecoveryStrategy,
    trip_policy: Option<&str>,
) -> RecoveryDrill {
    if let Some(policy) = trip_policy {
        manager
            .trip_circuit_breaker(component, policy, TRIP_FAILURE_KIND)
            .await;
    }

    let breaker_before = manager.get_circuit_breaker(component);
    let report = manager.recover_component(component, strategy).await;

    RecoveryDrill {
        breaker_before,
        report,
        breaker_after: manager.get_circuit_breaker(component),
    }
}

/// Run an operation that fails `failures` times before succeeding
pub async fn run_drill(
    manager: &FaultToleranceManager,
    component: &str,
    policy: &str,
    failures: u32,
    kind: FailureKind,
) -> ExecutionOutcome<String> {
    let calls = AtomicU32::new(0);

    let mut context = IncidentContext::new();
    context.insert("drill".to_string(), serde_json::Value::Bool(true));

    manager
        .execute_with_recovery(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < failures {
                        Err(anyhow::anyhow!("drill failure {} of {}", call + 1, failures)
                            .context(simulated_message(kind)))
                    } else {
                        Ok(format!("drill succeeded on call {}", call + 1))
                    }
                }
            },
            component,
            policy,
            context,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::OverallStatus;
    use warden_core_resilience::CircuitState;

    fn scenario(simulate: Vec<FailureKind>, trip_policy: Option<&str>) -> Scenario {
        Scenario {
            component: "gateway".to_string(),
            simulate,
            severity: Severity::High,
            trip_policy: trip_policy.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_empty_scenario_reports_healthy() {
        let manager = FaultToleranceManager::default();
        let scenario = scenario(Vec::new(), None);
        assert!(scenario.is_empty());

        let report = scenario.apply(&manager).await;
        assert!(report.simulations.is_empty());
        assert!(report.breaker.is_none());
        assert_eq!(manager.health().overall_status, OverallStatus::Healthy);
    }

    #[tokio::test]
    async fn test_simulated_failures_show_in_health() {
        let manager = FaultToleranceManager::default();
        let report = scenario(vec![FailureKind::Timeout; 6], None)
            .apply(&manager)
            .await;

        assert_eq!(report.simulations.len(), 6);
        let health = manager.get_system_health(60);
        assert_eq!(health.overall_status, OverallStatus::Critical);
        assert_eq!(health.failures_by_kind.get(&FailureKind::Timeout), Some(&6));

        let diagnosis = manager.diagnose(60);
        assert_ne!(diagnosis.recommendations, vec!["System operating normally"]);
        assert_eq!(diagnosis.trends.most_common_failure, Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_trip_policy_opens_breaker() {
        let manager = FaultToleranceManager::default();
        let report = scenario(Vec::new(), Some("network")).apply(&manager).await;

        let breaker = report.breaker.unwrap();
        assert_eq!(breaker.state, CircuitState::Open);
        assert_eq!(
            manager.get_circuit_breaker("gateway").map(|view| view.state),
            Some(CircuitState::Open)
        );
        assert_eq!(manager.diagnose(60).trends.circuit_breaker_trips, 1);
    }

    #[tokio::test]
    async fn test_recover_resets_tripped_breaker() {
        let manager = FaultToleranceManager::default();

        let drill = recover_component(
            &manager,
            "gateway",
            RecoveryStrategy::Restart,
            Some("network"),
        )
        .await;

        assert_eq!(
            drill.breaker_before.map(|view| view.state),
            Some(CircuitState::Open)
        );
        assert!(drill.report.successful);
        assert_eq!(
            drill.breaker_after.map(|view| (view.state, view.failure_count)),
            Some((CircuitState::Closed, 0))
        );
    }

    #[tokio::test]
    async fn test_recover_without_trip_has_no_breaker() {
        let manager = FaultToleranceManager::default();
        let drill = recover_component(&manager, "gateway", RecoveryStrategy::Restart, None).await;

        assert!(drill.breaker_before.is_none());
        assert!(drill.breaker_after.is_none());
        assert!(drill.report.successful);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drill_succeeds_after_failures() {
        let manager = FaultToleranceManager::default();
        let outcome = run_drill(&manager, "intake", "default", 2, FailureKind::Timeout).await;

        assert_eq!(outcome.attempts(), 3);
        assert_eq!(
            outcome.value().map(String::as_str),
            Some("drill succeeded on call 3")
        );
        assert!(manager
            .incidents()
            .iter()
            .all(|i| i.kind == FailureKind::Timeout && i.context["drill"] == true));
    }
}
