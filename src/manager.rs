//! Fault-tolerance manager
//!
//! [`FaultToleranceManager::execute_with_recovery`] is the entry point for
//! running a fallible operation. It resolves the named policy, retries with
//! exponential backoff (through the component's circuit breaker when the
//! policy asks for one), records one incident per failed attempt and, once
//! the attempts are spent, applies the policy's terminal strategy.
//!
//! The manager is cheap to clone; clones share the policy table, breaker
//! registry and incident log.
//!
//! ```no_run
//! use warden::{FaultToleranceManager, ManagerConfig};
//! use warden_core_resilience::IncidentContext;
//!
//! # async fn example() {
//! let manager = FaultToleranceManager::new(ManagerConfig::default());
//!
//! let outcome = manager
//!     .execute_with_recovery(
//!         || async { Ok::<_, std::io::Error>("contract reviewed") },
//!         "contracts",
//!         "critical",
//!         IncidentContext::new(),
//!     )
//!     .await;
//!
//! assert_eq!(outcome.value(), Some(&"contract reviewed"));
//! # }
//! ```

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use warden_core_resilience::{
    classify_message, BreakerError, BreakerRegistry, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerView, CircuitState, FailureIncident, FailureKind, IncidentContext, IncidentLog,
    PolicyTable, RecoveryPolicy, RecoveryStrategy, DEFAULT_INCIDENT_CAPACITY,
};

use crate::config::WardenConfig;
use crate::error::{Result, WardenError};
use crate::health::{Diagnosis, HealthReporter, HealthStatus};
use crate::recovery::{AcknowledgeRecovery, ComponentRecovery, RecoveryReport};
use crate::simulation::{simulated_message, Severity, SimulationReport};
use crate::strategy::{RecoveryOutcome, RecoveryStrategyExecutor};

/// Manager construction parameters
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub policies: PolicyTable,
    pub incident_capacity: usize,
    /// Cool-down for every breaker the manager creates
    pub breaker_recovery_timeout: Duration,
    /// Window used by [`FaultToleranceManager::health`]
    pub health_window_minutes: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            policies: PolicyTable::reference(),
            incident_capacity: DEFAULT_INCIDENT_CAPACITY,
            breaker_recovery_timeout: Duration::from_secs(60),
            health_window_minutes: 60,
        }
    }
}

/// Result of [`FaultToleranceManager::execute_with_recovery`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome<T> {
    /// The operation succeeded on attempt `attempts`
    Completed { value: T, attempts: u32 },

    /// Every attempt failed and the terminal strategy produced `outcome`
    Recovered {
        outcome: RecoveryOutcome,
        attempts: u32,
    },
}

impl<T> ExecutionOutcome<T> {
    /// Attempts made, between 1 and `max_retries + 1`
    pub fn attempts(&self) -> u32 {
        match self {
            ExecutionOutcome::Completed { attempts, .. }
            | ExecutionOutcome::Recovered { attempts, .. } => *attempts,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ExecutionOutcome::Completed { value, .. } => Some(value),
            ExecutionOutcome::Recovered { .. } => None,
        }
    }

    pub fn recovery(&self) -> Option<&RecoveryOutcome> {
        match self {
            ExecutionOutcome::Completed { .. } => None,
            ExecutionOutcome::Recovered { outcome, .. } => Some(outcome),
        }
    }

    /// True only when the terminal strategy escalated
    pub fn requires_manual_intervention(&self) -> bool {
        self.recovery()
            .is_some_and(RecoveryOutcome::requires_manual_intervention)
    }

    /// Surface escalation as an error; every other outcome passes through
    pub fn into_result(self) -> Result<Self> {
        match self {
            ExecutionOutcome::Recovered {
                outcome:
                    RecoveryOutcome::Escalated {
                        incident_id,
                        component,
                        ..
                    },
                ..
            } => Err(WardenError::Escalated {
                incident_id,
                component,
            }),
            other => Ok(other),
        }
    }
}

/// Orchestrates retries, breakers, incidents and recovery
#[derive(Clone)]
pub struct FaultToleranceManager {
    policies: Arc<PolicyTable>,
    breakers: BreakerRegistry,
    incidents: Arc<IncidentLog>,
    recovery: Arc<dyn ComponentRecovery>,
    executor: RecoveryStrategyExecutor,
    reporter: HealthReporter,
    breaker_recovery_timeout: Duration,
    health_window_minutes: u32,
}

impl fmt::Debug for FaultToleranceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultToleranceManager")
            .field("policies", &self.policies.names())
            .field("breakers", &self.breakers.len())
            .field("incidents", &self.incidents.len())
            .field("breaker_recovery_timeout", &self.breaker_recovery_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for FaultToleranceManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl FaultToleranceManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            policies: Arc::new(config.policies),
            breakers: BreakerRegistry::new(),
            incidents: Arc::new(IncidentLog::new(config.incident_capacity)),
            recovery: Arc::new(AcknowledgeRecovery),
            executor: RecoveryStrategyExecutor::new(),
            reporter: HealthReporter::new(),
            breaker_recovery_timeout: config.breaker_recovery_timeout,
            health_window_minutes: config.health_window_minutes,
        }
    }

    /// Build a manager from validated configuration
    pub fn from_config(config: &WardenConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(ManagerConfig {
            policies: config.policy_table()?,
            incident_capacity: config.incident_capacity,
            breaker_recovery_timeout: config.breaker_recovery_timeout,
            health_window_minutes: config.health_window_minutes,
        }))
    }

    /// Replace the component recovery hook
    pub fn with_recovery(mut self, recovery: Arc<dyn ComponentRecovery>) -> Self {
        self.recovery = recovery;
        self
    }

    /// Run `operation` under the named policy
    ///
    /// Operation errors never escape: the caller gets either the value or
    /// the terminal [`RecoveryOutcome`]. Dropping the returned future
    /// abandons any remaining attempts.
    pub async fn execute_with_recovery<F, Fut, T, E>(
        &self,
        operation: F,
        component: &str,
        policy_name: &str,
        context: IncidentContext,
    ) -> ExecutionOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let span = tracing::info_span!("execute_with_recovery", component, policy = policy_name);
        self.run_attempts(operation, component, policy_name, context)
            .instrument(span)
            .await
    }

    async fn run_attempts<F, Fut, T, E>(
        &self,
        mut operation: F,
        component: &str,
        policy_name: &str,
        context: IncidentContext,
    ) -> ExecutionOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let policy = self.policies.lookup(policy_name).clone();
        let max_attempts = policy.max_attempts();

        let breaker = (policy.strategy == RecoveryStrategy::CircuitBreaker)
            .then(|| self.breaker_for(component, &policy));

        let mut last_error = String::new();
        let mut last_incident_id = String::new();

        for attempt in 0..max_attempts {
            let result = match &breaker {
                Some(breaker) => breaker.call(|| operation()).await,
                None => operation().await.map_err(BreakerError::Failed),
            };

            let (message, stack_trace) = match result {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempts = attempt + 1, "operation succeeded after retry");
                    }
                    return ExecutionOutcome::Completed {
                        value,
                        attempts: attempt + 1,
                    };
                }
                Err(BreakerError::Failed(e)) => (e.to_string(), format!("{:?}", e)),
                Err(BreakerError::Rejected(e)) => (e.to_string(), format!("{:?}", e)),
            };

            let kind = classify_message(&message);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts,
                kind = %kind,
                error = %message,
                "attempt failed"
            );

            last_incident_id = self.record(
                kind,
                component,
                message.clone(),
                stack_trace,
                context.clone(),
                attempt,
            );
            last_error = message;

            if attempt + 1 < max_attempts {
                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(?delay, "backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }

        let outcome = self.apply_strategy(&policy, component, &last_error, &last_incident_id);
        ExecutionOutcome::Recovered {
            outcome,
            attempts: max_attempts,
        }
    }

    fn breaker_for(&self, component: &str, policy: &RecoveryPolicy) -> CircuitBreaker {
        self.breakers.get_or_create(
            component,
            CircuitBreakerConfig {
                failure_threshold: policy.circuit_breaker_threshold,
                recovery_timeout: self.breaker_recovery_timeout,
            },
        )
    }

    fn apply_strategy(
        &self,
        policy: &RecoveryPolicy,
        component: &str,
        error: &str,
        incident_id: &str,
    ) -> RecoveryOutcome {
        let outcome = self.executor.apply(policy, component, error, incident_id);
        tracing::info!(
            component,
            strategy = %policy.strategy,
            outcome = outcome.label(),
            "recovery strategy applied"
        );
        outcome
    }

    fn record(
        &self,
        kind: FailureKind,
        component: &str,
        message: String,
        stack_trace: String,
        context: IncidentContext,
        recovery_attempts: u32,
    ) -> String {
        let incident = FailureIncident::new(
            kind,
            component,
            message,
            stack_trace,
            context,
            recovery_attempts,
        );
        let id = incident.id.clone();
        tracing::error!(
            incident_id = %id,
            component,
            kind = %kind,
            error = %incident.message,
            "incident registered"
        );
        self.incidents.append(incident);
        id
    }

    /// Record a failure observed outside `execute_with_recovery`
    pub fn register_incident<E>(
        &self,
        component: &str,
        kind: FailureKind,
        error: &E,
        context: IncidentContext,
    ) -> String
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        self.record(
            kind,
            component,
            error.to_string(),
            format!("{:?}", error),
            context,
            0,
        )
    }

    /// Health over the trailing `window_minutes`
    pub fn get_system_health(&self, window_minutes: u32) -> HealthStatus {
        self.reporter
            .snapshot(&self.incidents, self.breakers.views(), window_minutes)
    }

    /// Health over the configured default window
    pub fn health(&self) -> HealthStatus {
        self.get_system_health(self.health_window_minutes)
    }

    /// Health snapshot with recommendations and trends
    pub fn diagnose(&self, window_minutes: u32) -> Diagnosis {
        self.reporter.diagnose(self.get_system_health(window_minutes))
    }

    pub fn get_circuit_breaker(&self, component: &str) -> Option<CircuitBreakerView> {
        self.breakers.get(component).map(|breaker| breaker.view())
    }

    /// Force a component's breaker closed. Returns false if it has none.
    pub fn reset_circuit_breaker(&self, component: &str) -> bool {
        self.breakers.reset(component)
    }

    /// Run the recovery hook; on success the component's breaker is reset
    pub async fn recover_component(
        &self,
        component: &str,
        strategy: RecoveryStrategy,
    ) -> RecoveryReport {
        tracing::info!(component, %strategy, "recovering component");

        match self.recovery.recover(component, strategy).await {
            Ok(()) => {
                if self.breakers.reset(component) {
                    tracing::info!(component, "circuit breaker cleared after recovery");
                }
                RecoveryReport::succeeded(component, strategy)
            }
            Err(reason) => {
                tracing::warn!(component, %strategy, error = %reason, "component recovery failed");
                RecoveryReport::failed(component, strategy, reason)
            }
        }
    }

    /// Inject a synthetic incident and apply the default policy's strategy
    pub fn simulate_failure(
        &self,
        kind: FailureKind,
        component: &str,
        severity: Severity,
    ) -> SimulationReport {
        let message = simulated_message(kind);

        let mut context = IncidentContext::new();
        context.insert("simulation".to_string(), serde_json::Value::Bool(true));
        context.insert(
            "severity".to_string(),
            serde_json::Value::String(severity.to_string()),
        );

        let incident_id = self.register_incident(component, kind, message, context);
        let recovery = self.apply_strategy(
            self.policies.default_policy(),
            component,
            message,
            &incident_id,
        );

        SimulationReport {
            incident_id,
            kind,
            component: component.to_string(),
            severity,
            message: message.to_string(),
            recovery,
        }
    }

    /// Drive a component's breaker open with synthetic failures
    ///
    /// The breaker is created with the named policy's threshold if it does
    /// not exist yet. Each failure is recorded as an incident. No backoff is
    /// applied, so the breaker stays open until its recovery timeout passes
    /// or it is reset.
    pub async fn trip_circuit_breaker(
        &self,
        component: &str,
        policy_name: &str,
        kind: FailureKind,
    ) -> CircuitBreakerView {
        let breaker = self.breaker_for(component, self.policies.lookup(policy_name));
        let message = simulated_message(kind);

        let mut context = IncidentContext::new();
        context.insert("drill".to_string(), serde_json::Value::Bool(true));

        for _ in 0..breaker.config().failure_threshold {
            if breaker.get_state() == CircuitState::Open {
                break;
            }
            match breaker.call(move || async move { Err::<(), _>(message) }).await {
                Err(BreakerError::Failed(e)) => {
                    self.record(
                        kind,
                        component,
                        e.to_string(),
                        format!("{:?}", e),
                        context.clone(),
                        0,
                    );
                }
                Err(BreakerError::Rejected(e)) => {
                    tracing::debug!(component, error = %e, "breaker rejected drill failure");
                    break;
                }
                Ok(()) => {}
            }
        }

        let view = breaker.view();
        tracing::info!(component, state = %view.state, "circuit breaker drill finished");
        view
    }

    /// Snapshot of retained incidents, oldest first
    pub fn incidents(&self) -> Vec<FailureIncident> {
        self.incidents.snapshot()
    }

    pub fn incident_log(&self) -> &IncidentLog {
        &self.incidents
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn breaker_recovery_timeout(&self) -> Duration {
        self.breaker_recovery_timeout
    }

    pub fn health_window_minutes(&self) -> u32 {
        self.health_window_minutes
    }
}
