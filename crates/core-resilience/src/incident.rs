//! Incident Log: bounded, thread-safe record of failure incidents
//!
//! Every caught failure becomes a [`FailureIncident`] appended to the
//! [`IncidentLog`]. The log is a ring buffer: once it holds `capacity`
//! entries, each append evicts the oldest one. Append is the only mutation;
//! readers receive cloned snapshots taken under the lock.
//!
//! # Example
//!
//! ```
//! use warden_core_resilience::classifier::FailureKind;
//! use warden_core_resilience::incident::{FailureIncident, IncidentContext, IncidentLog};
//!
//! let log = IncidentLog::new(2);
//!
//! for component in ["a", "b", "c"] {
//!     log.append(FailureIncident::new(
//!         FailureKind::Timeout,
//!         component,
//!         "request timeout",
//!         "",
//!         IncidentContext::new(),
//!         0,
//!     ));
//! }
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.stats().total_evicted, 1);
//! assert_eq!(log.snapshot()[0].component, "b");
//! ```

use crate::classifier::FailureKind;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

/// Default number of incidents retained
pub const DEFAULT_INCIDENT_CAPACITY: usize = 1000;

/// Free-form diagnostic context attached to an incident
pub type IncidentContext = BTreeMap<String, serde_json::Value>;

/// A recorded failure event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureIncident {
    /// Unique incident id (`inc-<uuid>`)
    pub id: String,

    /// Heuristic failure category
    pub kind: FailureKind,

    /// Component the failing operation belonged to
    pub component: String,

    /// Error display text
    pub message: String,

    /// Error debug rendering, including any cause chain
    pub stack_trace: String,

    /// When the failure was observed
    pub timestamp: DateTime<Utc>,

    /// Caller-supplied diagnostic context
    pub context: IncidentContext,

    /// Attempts already made for the same logical call before this failure
    pub recovery_attempts: u32,

    pub resolved: bool,

    pub resolved_at: Option<DateTime<Utc>>,
}

impl FailureIncident {
    /// Create an unresolved incident stamped with the current time
    pub fn new(
        kind: FailureKind,
        component: impl Into<String>,
        message: impl Into<String>,
        stack_trace: impl Into<String>,
        context: IncidentContext,
        recovery_attempts: u32,
    ) -> Self {
        Self {
            id: format!("inc-{}", Uuid::new_v4().simple()),
            kind,
            component: component.into(),
            message: message.into(),
            stack_trace: stack_trace.into(),
            timestamp: Utc::now(),
            context,
            recovery_attempts,
            resolved: false,
            resolved_at: None,
        }
    }

    /// Whether the incident happened strictly less than `window` before `now`
    pub fn is_within(&self, window: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) < window
    }
}

/// Incident log statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentLogStats {
    /// Incidents currently retained
    pub current_count: usize,
    /// Maximum retained incidents
    pub capacity: usize,
    /// Incidents ever appended
    pub total_recorded: u64,
    /// Incidents evicted due to capacity
    pub total_evicted: u64,
}

#[derive(Debug)]
struct LogInner {
    entries: VecDeque<FailureIncident>,
    total_recorded: u64,
    total_evicted: u64,
}

/// Bounded FIFO incident log
#[derive(Debug)]
pub struct IncidentLog {
    inner: Mutex<LogInner>,
    capacity: usize,
}

impl IncidentLog {
    /// Create a log retaining at most `capacity` incidents (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(LogInner {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                total_recorded: 0,
                total_evicted: 0,
            }),
            capacity,
        }
    }

    /// Append an incident, evicting the oldest when full
    pub fn append(&self, incident: FailureIncident) {
        let mut inner = self.inner.lock();
        inner.total_recorded += 1;

        if inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
            inner.total_evicted += 1;
        }

        inner.entries.push_back(incident);
    }

    /// All retained incidents, oldest first
    pub fn snapshot(&self) -> Vec<FailureIncident> {
        self.inner.lock().entries.iter().cloned().collect()
    }

    /// Incidents within the trailing `window` of `now`, oldest first
    pub fn recent(&self, window: chrono::Duration, now: DateTime<Utc>) -> Vec<FailureIncident> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|incident| incident.is_within(window, now))
            .cloned()
            .collect()
    }

    /// Look up a retained incident by id
    pub fn get(&self, id: &str) -> Option<FailureIncident> {
        self.inner
            .lock()
            .entries
            .iter()
            .find(|incident| incident.id == id)
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().entries.iter().any(|incident| incident.id == id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> IncidentLogStats {
        let inner = self.inner.lock();
        IncidentLogStats {
            current_count: inner.entries.len(),
            capacity: self.capacity,
            total_recorded: inner.total_recorded,
            total_evicted: inner.total_evicted,
        }
    }
}

impl Default for IncidentLog {
    fn default() -> Self {
        Self::new(DEFAULT_INCIDENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_incident(component: &str) -> FailureIncident {
        FailureIncident::new(
            FailureKind::AgentFailure,
            component,
            "agent processing failed",
            "AgentError(\"agent processing failed\")",
            IncidentContext::new(),
            0,
        )
    }

    #[test]
    fn test_append_and_snapshot_order() {
        let log = IncidentLog::new(10);
        log.append(make_incident("a"));
        log.append(make_incident("b"));

        let components: Vec<String> = log.snapshot().into_iter().map(|i| i.component).collect();
        assert_eq!(components, vec!["a", "b"]);
    }

    #[test]
    fn test_default_capacity() {
        let log = IncidentLog::default();
        assert_eq!(log.capacity(), 1000);
        assert!(log.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let log = IncidentLog::new(1000);
        let first = make_incident("first");
        let first_id = first.id.clone();
        log.append(first);

        for i in 0..1000 {
            log.append(make_incident(&format!("c{}", i)));
        }

        assert_eq!(log.len(), 1000);
        assert!(!log.contains(&first_id));
        assert_eq!(log.snapshot()[0].component, "c0");

        let stats = log.stats();
        assert_eq!(stats.total_recorded, 1001);
        assert_eq!(stats.total_evicted, 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let log = IncidentLog::new(0);
        log.append(make_incident("a"));
        log.append(make_incident("b"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.snapshot()[0].component, "b");
    }

    #[test]
    fn test_recent_window() {
        let log = IncidentLog::new(10);
        let now = Utc::now();

        let mut old = make_incident("old");
        old.timestamp = now - chrono::Duration::minutes(90);
        log.append(old);

        let mut edge = make_incident("edge");
        edge.timestamp = now - chrono::Duration::minutes(60);
        log.append(edge);

        let mut fresh = make_incident("fresh");
        fresh.timestamp = now - chrono::Duration::minutes(5);
        log.append(fresh);

        let recent = log.recent(chrono::Duration::minutes(60), now);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].component, "fresh");
    }

    #[test]
    fn test_lookup_helpers() {
        let log = IncidentLog::new(10);
        let incident = make_incident("billing");
        let id = incident.id.clone();
        log.append(incident);
        log.append(make_incident("search"));
        log.append(make_incident("billing"));

        assert_eq!(log.len(), 3);
        assert_eq!(log.get(&id).map(|i| i.component), Some("billing".to_string()));
        assert!(log.get("inc-missing").is_none());
    }

    #[test]
    fn test_new_incident_defaults() {
        let incident = make_incident("x");
        assert!(incident.id.starts_with("inc-"));
        assert!(!incident.resolved);
        assert!(incident.resolved_at.is_none());
        assert_ne!(incident.id, make_incident("x").id);
    }

    #[test]
    fn test_concurrent_appends_respect_capacity() {
        use std::sync::Arc;

        let log = Arc::new(IncidentLog::new(50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.append(make_incident(&format!("t{}-{}", t, i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = log.stats();
        assert_eq!(stats.current_count, 50);
        assert_eq!(stats.total_recorded, 800);
        assert_eq!(stats.total_evicted, 750);
    }
}
