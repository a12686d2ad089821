//! Recovery policies and the policy table
//!
//! A [`RecoveryPolicy`] describes how an operation class is retried and
//! which terminal [`RecoveryStrategy`] applies once retries are exhausted.
//! Policies are looked up by name from a [`PolicyTable`]; unknown names
//! resolve to the `default` entry.
//!
//! # Example
//!
//! ```
//! use warden_core_resilience::policy::{PolicyTable, RecoveryStrategy};
//! use std::time::Duration;
//!
//! let table = PolicyTable::reference();
//! let network = table.lookup("network");
//! assert_eq!(network.strategy, RecoveryStrategy::CircuitBreaker);
//!
//! // Unknown names fall back to `default`
//! assert_eq!(table.lookup("no-such-policy").max_retries, 3);
//!
//! // Delay before the second retry: 1s * 2.0^1
//! assert_eq!(table.lookup("default").delay_for_attempt(1), Duration::from_secs(2));
//! ```

use crate::error::ResilienceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Name of the policy every table must contain
pub const DEFAULT_POLICY: &str = "default";

/// Terminal recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Retry,
    Fallback,
    CircuitBreaker,
    GracefulDegradation,
    Restart,
    Escalate,
}

impl RecoveryStrategy {
    pub const ALL: [RecoveryStrategy; 6] = [
        RecoveryStrategy::Retry,
        RecoveryStrategy::Fallback,
        RecoveryStrategy::CircuitBreaker,
        RecoveryStrategy::GracefulDegradation,
        RecoveryStrategy::Restart,
        RecoveryStrategy::Escalate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::Retry => "retry",
            RecoveryStrategy::Fallback => "fallback",
            RecoveryStrategy::CircuitBreaker => "circuit_breaker",
            RecoveryStrategy::GracefulDegradation => "graceful_degradation",
            RecoveryStrategy::Restart => "restart",
            RecoveryStrategy::Escalate => "escalate",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryStrategy {
    type Err = ResilienceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        RecoveryStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| ResilienceError::UnknownStrategy(s.to_string()))
    }
}

/// (De)serialize a [`Duration`] as floating-point seconds
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Recovery policy for one class of operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(with = "duration_secs")]
    pub retry_delay: Duration,

    /// Growth factor applied per attempt, never below 1.0
    pub backoff_multiplier: f64,

    /// Target named in a delegated result when the strategy is `Fallback`
    #[serde(default)]
    pub fallback_target: Option<String>,

    /// Consecutive failures that open the component's breaker
    ///
    /// Must be at least 1; [`validate`](Self::validate) rejects 0.
    pub circuit_breaker_threshold: u32,

    /// Terminal strategy once retries are exhausted
    pub strategy: RecoveryStrategy,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            fallback_target: Some("master_legal".to_string()),
            circuit_breaker_threshold: 5,
            strategy: RecoveryStrategy::Retry,
        }
    }
}

impl RecoveryPolicy {
    /// Policy used for critical operations: more retries, quicker, delegates on exhaustion
    pub fn critical() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_millis(500),
            backoff_multiplier: 1.5,
            fallback_target: Some("master_legal".to_string()),
            circuit_breaker_threshold: 3,
            strategy: RecoveryStrategy::Fallback,
        }
    }

    /// Policy used for network calls: many slow retries behind a breaker
    pub fn network() -> Self {
        Self {
            max_retries: 10,
            retry_delay: Duration::from_secs(2),
            backoff_multiplier: 1.2,
            fallback_target: None,
            circuit_breaker_threshold: 8,
            strategy: RecoveryStrategy::CircuitBreaker,
        }
    }

    /// Total attempts the retry loop may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff delay after the failed attempt with index `attempt` (0-based)
    ///
    /// `retry_delay * backoff_multiplier^attempt`, saturating at `Duration::MAX`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.retry_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Validate the policy
    pub fn validate(&self, name: &str) -> Result<(), ResilienceError> {
        let invalid = |reason: &str| ResilienceError::InvalidPolicy {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(invalid("backoff_multiplier must be a finite value >= 1.0"));
        }

        if self.circuit_breaker_threshold == 0 {
            return Err(invalid("circuit_breaker_threshold must be at least 1"));
        }

        if self.strategy == RecoveryStrategy::Fallback && self.fallback_target.is_none() {
            tracing::warn!(
                policy = name,
                "fallback strategy without a fallback target degrades gracefully instead"
            );
        }

        Ok(())
    }
}

/// Name → policy mapping with a mandatory `default` entry
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<String, RecoveryPolicy>,
}

impl PolicyTable {
    /// Create a table containing only the given default policy
    pub fn new(default: RecoveryPolicy) -> Result<Self, ResilienceError> {
        default.validate(DEFAULT_POLICY)?;
        let mut policies = HashMap::new();
        policies.insert(DEFAULT_POLICY.to_string(), default);
        Ok(Self { policies })
    }

    /// The stock `default`, `critical` and `network` policies
    pub fn reference() -> Self {
        let mut policies = HashMap::new();
        policies.insert(DEFAULT_POLICY.to_string(), RecoveryPolicy::default());
        policies.insert("critical".to_string(), RecoveryPolicy::critical());
        policies.insert("network".to_string(), RecoveryPolicy::network());
        Self { policies }
    }

    /// Add or replace a policy after validating it
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        policy: RecoveryPolicy,
    ) -> Result<(), ResilienceError> {
        let name = name.into();
        policy.validate(&name)?;
        self.policies.insert(name, policy);
        Ok(())
    }

    /// Look up a policy, falling back to `default` for unknown names
    pub fn lookup(&self, name: &str) -> &RecoveryPolicy {
        self.policies
            .get(name)
            .unwrap_or_else(|| self.default_policy())
    }

    /// Exact lookup without fallback
    pub fn get(&self, name: &str) -> Option<&RecoveryPolicy> {
        self.policies.get(name)
    }

    /// The `default` policy
    pub fn default_policy(&self) -> &RecoveryPolicy {
        // Every constructor inserts `default` and nothing removes it.
        &self.policies[DEFAULT_POLICY]
    }

    /// Policy names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of policies
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Always false: the default entry is mandatory
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::reference()
    }
}
