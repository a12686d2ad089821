//! Circuit Breaker implementation for fault tolerance
//!
//! The circuit breaker prevents cascading failures by failing fast when a
//! component is experiencing issues. It has three states:
//! - Closed: Normal operation, requests pass through
//! - Open: Component is unhealthy, requests fail immediately
//! - HalfOpen: A single probe request tests whether the component recovered
//!
//! Admission is permit based. [`CircuitBreaker::try_acquire`] either rejects
//! the call or hands out a [`BreakerPermit`]; the caller runs its operation
//! and reports the outcome through the permit. The breaker lock is only held
//! while checking or transitioning state, never while the operation runs.

use super::error::ResilienceError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// State of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, requests pass through normally
    Closed,
    /// Circuit is open, requests fail immediately
    Open,
    /// Circuit is half-open, one probe request is allowed through
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,
    /// Time since the last failure after which an open circuit admits a probe
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Internal state of the circuit breaker
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    probe_in_flight: bool,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            last_failure_at: None,
            probe_in_flight: false,
        }
    }

    fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure = Some(Instant::now());
        self.last_failure_at = Some(Utc::now());
    }
}

/// Read-only view of a breaker, safe to hand to reporting code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerView {
    pub component: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    #[serde(with = "crate::policy::duration_secs")]
    pub recovery_timeout: Duration,
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Error returned by [`CircuitBreaker::call`]
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The breaker rejected the call; the operation was not run
    Rejected(ResilienceError),
    /// The operation ran and failed
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Rejected(e) => write!(f, "{}", e),
            BreakerError::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for BreakerError<E> {}

/// Circuit breaker guarding a single component
///
/// # Example
/// ```no_run
/// use warden_core_resilience::{CircuitBreaker, CircuitBreakerConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let breaker = CircuitBreaker::new("search", CircuitBreakerConfig::default());
///
///     let result = breaker
///         .call(|| async { Ok::<_, std::io::Error>(42) })
///         .await;
///
///     assert_eq!(result.unwrap(), 42);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    component: Arc<str>,
    config: Arc<CircuitBreakerConfig>,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for `component`
    pub fn new(component: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            component: Arc::from(component.into()),
            config: Arc::new(config),
            state: Arc::new(Mutex::new(BreakerState::new())),
        }
    }

    /// Component this breaker guards
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Breaker configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current state of the circuit breaker
    pub fn get_state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// Get current failure count
    pub fn get_failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    /// Consistent snapshot of the breaker
    pub fn view(&self) -> CircuitBreakerView {
        let state = self.state.lock();
        CircuitBreakerView {
            component: self.component.to_string(),
            state: state.state,
            failure_count: state.failure_count,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout: self.config.recovery_timeout,
            last_failure_at: state.last_failure_at,
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = BreakerState::new();
        tracing::info!(component = %self.component, "circuit breaker reset");
    }

    /// Ask for permission to run one call
    ///
    /// Closed admits every call. Open rejects until more than
    /// `recovery_timeout` has passed since the last failure, then moves to
    /// HalfOpen and admits this call as the probe. HalfOpen rejects while
    /// the probe is in flight.
    pub fn try_acquire(&self) -> Result<BreakerPermit, ResilienceError> {
        let mut state = self.state.lock();

        match state.state {
            CircuitState::Closed => Ok(self.permit(false)),
            CircuitState::Open => {
                let cooled_down = state
                    .last_failure
                    .is_some_and(|t| t.elapsed() > self.config.recovery_timeout);

                if cooled_down {
                    state.state = CircuitState::HalfOpen;
                    state.probe_in_flight = true;
                    tracing::info!(component = %self.component, "circuit half-open, admitting probe");
                    Ok(self.permit(true))
                } else {
                    Err(ResilienceError::CircuitOpen {
                        component: self.component.to_string(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if state.probe_in_flight {
                    Err(ResilienceError::ProbeInFlight {
                        component: self.component.to_string(),
                    })
                } else {
                    state.probe_in_flight = true;
                    Ok(self.permit(true))
                }
            }
        }
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().map_err(BreakerError::Rejected)?;

        match op().await {
            Ok(value) => {
                permit.succeed();
                Ok(value)
            }
            Err(e) => {
                permit.fail();
                Err(BreakerError::Failed(e))
            }
        }
    }

    fn permit(&self, probe: bool) -> BreakerPermit {
        BreakerPermit {
            breaker: self.clone(),
            probe,
            settled: false,
        }
    }

    fn on_success(&self, probe: bool) {
        let mut state = self.state.lock();

        match state.state {
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            CircuitState::HalfOpen if probe => {
                state.state = CircuitState::Closed;
                state.failure_count = 0;
                state.probe_in_flight = false;
                tracing::info!(component = %self.component, "probe succeeded, circuit closed");
            }
            // Stale outcome of a call admitted before the circuit opened
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let mut state = self.state.lock();
        state.record_failure();

        match state.state {
            CircuitState::Closed => {
                if state.failure_count >= self.config.failure_threshold {
                    state.state = CircuitState::Open;
                    tracing::warn!(
                        component = %self.component,
                        failures = state.failure_count,
                        "failure threshold reached, circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen if probe => {
                state.state = CircuitState::Open;
                state.probe_in_flight = false;
                tracing::warn!(component = %self.component, "probe failed, circuit re-opened");
            }
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    fn release_probe(&self) {
        let mut state = self.state.lock();
        if state.state == CircuitState::HalfOpen {
            state.probe_in_flight = false;
        }
    }
}

/// Permission to run one call through a [`CircuitBreaker`]
///
/// Report the outcome with [`succeed`](Self::succeed) or
/// [`fail`](Self::fail). Dropping an unsettled probe permit frees the probe
/// slot so the next caller may probe instead.
#[must_use = "report the call outcome through the permit"]
#[derive(Debug)]
pub struct BreakerPermit {
    breaker: CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl BreakerPermit {
    /// Whether this permit is the half-open probe
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// Record a successful call
    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    /// Record a failed call
    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker(threshold: u32, timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test-component",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: timeout,
            },
        )
    }

    async fn fail_once(breaker: &CircuitBreaker) {
        let result: Result<(), _> = breaker
            .call(|| async { Err::<(), _>("upstream exploded") })
            .await;
        assert!(matches!(result, Err(BreakerError::Failed(_))));
    }

    #[tokio::test]
    async fn test_circuit_breaker_closed_to_open() {
        let breaker = breaker(3, Duration::from_secs(60));

        fail_once(&breaker).await;
        fail_once(&breaker).await;
        assert_eq!(breaker.get_state(), CircuitState::Closed);
        assert_eq!(breaker.get_failure_count(), 2);

        fail_once(&breaker).await;
        assert_eq!(breaker.get_state(), CircuitState::Open);
        assert_eq!(breaker.get_failure_count(), 3);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_count() {
        let breaker = breaker(3, Duration::from_secs(60));

        fail_once(&breaker).await;
        fail_once(&breaker).await;
        let ok: Result<u8, BreakerError<&str>> = breaker.call(|| async { Ok(1) }).await;
        assert!(ok.is_ok());
        assert_eq!(breaker.get_failure_count(), 0);

        fail_once(&breaker).await;
        assert_eq!(breaker.get_state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_running_operation() {
        let breaker = breaker(1, Duration::from_secs(60));
        fail_once(&breaker).await;

        let runs = AtomicUsize::new(0);
        let result: Result<(), BreakerError<&str>> = breaker
            .call(|| async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(BreakerError::Rejected(ResilienceError::CircuitOpen { .. }))
        ));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_success_closes() {
        let breaker = breaker(2, Duration::from_millis(50));
        fail_once(&breaker).await;
        fail_once(&breaker).await;
        assert_eq!(breaker.get_state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(51)).await;

        let permit = breaker.try_acquire().unwrap();
        assert!(permit.is_probe());
        assert_eq!(breaker.get_state(), CircuitState::HalfOpen);

        permit.succeed();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
        assert_eq!(breaker.get_failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_failure_reopens() {
        let breaker = breaker(2, Duration::from_millis(50));
        fail_once(&breaker).await;
        fail_once(&breaker).await;

        tokio::time::advance(Duration::from_millis(51)).await;
        fail_once(&breaker).await;

        assert_eq!(breaker.get_state(), CircuitState::Open);
        assert_eq!(breaker.get_failure_count(), 3);
        assert!(breaker.try_acquire().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_must_be_strictly_exceeded() {
        let breaker = breaker(1, Duration::from_millis(50));
        fail_once(&breaker).await;

        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(breaker.try_acquire().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(breaker.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_probe_in_flight() {
        let breaker = breaker(1, Duration::from_millis(10));
        fail_once(&breaker).await;
        tokio::time::advance(Duration::from_millis(11)).await;

        let probe = breaker.try_acquire().unwrap();
        let second = breaker.try_acquire();
        assert!(matches!(second, Err(ResilienceError::ProbeInFlight { .. })));

        probe.fail();
        assert_eq!(breaker.get_state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_frees_slot() {
        let breaker = breaker(1, Duration::from_millis(10));
        fail_once(&breaker).await;
        tokio::time::advance(Duration::from_millis(11)).await;

        let probe = breaker.try_acquire().unwrap();
        drop(probe);
        assert_eq!(breaker.get_state(), CircuitState::HalfOpen);

        let next = breaker.try_acquire().unwrap();
        assert!(next.is_probe());
        next.succeed();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_reset() {
        let breaker = breaker(1, Duration::from_secs(60));
        fail_once(&breaker).await;
        assert_eq!(breaker.get_state(), CircuitState::Open);

        breaker.reset();

        let view = breaker.view();
        assert_eq!(view.state, CircuitState::Closed);
        assert_eq!(view.failure_count, 0);
        assert!(view.last_failure_at.is_none());
    }

    #[tokio::test]
    async fn test_view_reports_config() {
        let breaker = breaker(4, Duration::from_secs(30));
        fail_once(&breaker).await;

        let view = breaker.view();
        assert_eq!(view.component, "test-component");
        assert_eq!(view.failure_threshold, 4);
        assert_eq!(view.recovery_timeout, Duration::from_secs(30));
        assert_eq!(view.failure_count, 1);
        assert!(view.last_failure_at.is_some());
    }
}
