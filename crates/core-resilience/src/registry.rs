//! Breaker Registry: one circuit breaker per component, created lazily
//!
//! The registry is a concurrent map. Creating a breaker is an atomic
//! insert-if-absent, so two callers racing on a new component always end up
//! sharing the same breaker. The first caller's configuration wins; later
//! lookups with a different threshold reuse the existing breaker.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerView};
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent component → breaker map
#[derive(Debug, Clone, Default)]
pub struct BreakerRegistry {
    breakers: Arc<DashMap<String, CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the component's breaker, creating it with `config` if absent
    pub fn get_or_create(&self, component: &str, config: CircuitBreakerConfig) -> CircuitBreaker {
        if let Some(existing) = self.breakers.get(component) {
            return existing.value().clone();
        }

        self.breakers
            .entry(component.to_string())
            .or_insert_with(|| {
                tracing::debug!(
                    component,
                    threshold = config.failure_threshold,
                    "creating circuit breaker"
                );
                CircuitBreaker::new(component, config)
            })
            .value()
            .clone()
    }

    /// Get an existing breaker
    pub fn get(&self, component: &str) -> Option<CircuitBreaker> {
        self.breakers.get(component).map(|b| b.value().clone())
    }

    /// Reset a component's breaker to Closed. Returns false if none exists.
    pub fn reset(&self, component: &str) -> bool {
        match self.get(component) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Views of every breaker, sorted by component
    pub fn views(&self) -> Vec<CircuitBreakerView> {
        let breakers: Vec<CircuitBreaker> =
            self.breakers.iter().map(|e| e.value().clone()).collect();
        let mut views: Vec<CircuitBreakerView> = breakers.iter().map(CircuitBreaker::view).collect();
        views.sort_by(|a, b| a.component.cmp(&b.component));
        views
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
