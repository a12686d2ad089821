//! Aggregate system health
//!
//! [`HealthReporter`] folds the incident log and breaker views into a
//! [`HealthStatus`] snapshot, and [`HealthReporter::diagnose`] derives
//! operator recommendations and trends from one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use warden_core_resilience::{CircuitBreakerView, CircuitState, FailureKind, IncidentLog};

/// Recent incidents at or above this count mark the system critical
pub const CRITICAL_INCIDENT_THRESHOLD: usize = 5;

/// Recent incidents below this count keep the incident frequency normal
pub const HIGH_FREQUENCY_THRESHOLD: usize = 3;

/// Minutes until the next recommended health check
pub const NEXT_CHECK_MINUTES: u32 = 15;

/// Overall system status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    Warning,
    Critical,
}

impl OverallStatus {
    /// Status for a number of incidents inside the health window
    pub fn from_recent_incidents(recent: usize) -> Self {
        match recent {
            0 => OverallStatus::Healthy,
            n if n < CRITICAL_INCIDENT_THRESHOLD => OverallStatus::Warning,
            _ => OverallStatus::Critical,
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Healthy => write!(f, "healthy"),
            OverallStatus::Warning => write!(f, "warning"),
            OverallStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Point-in-time health snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub overall_status: OverallStatus,

    /// Incidents currently retained by the log
    pub total_incidents: usize,

    /// Incidents inside the trailing window
    pub recent_incidents: usize,

    /// Recent incidents per kind
    pub failures_by_kind: BTreeMap<FailureKind, usize>,

    pub circuit_breakers: BTreeMap<String, CircuitBreakerView>,

    pub monitoring_active: bool,

    pub window_minutes: u32,

    pub last_check: DateTime<Utc>,
}

/// Incident frequency trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentFrequency {
    Normal,
    High,
}

/// Trends derived from a health snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthTrends {
    pub incident_frequency: IncidentFrequency,

    /// Most frequent recent kind; ties resolve to the first kind in order
    pub most_common_failure: Option<FailureKind>,

    /// Breakers not currently closed
    pub circuit_breaker_trips: usize,
}

/// Health snapshot plus operator guidance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub health: HealthStatus,
    pub recommendations: Vec<String>,
    pub trends: HealthTrends,
    pub next_check_minutes: u32,
    pub diagnosed_at: DateTime<Utc>,
}

/// Builds health snapshots and diagnoses
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthReporter;

impl HealthReporter {
    pub fn new() -> Self {
        Self
    }

    /// Summarize the incident log and `breakers` over the trailing window
    pub fn snapshot(
        &self,
        incidents: &IncidentLog,
        breakers: Vec<CircuitBreakerView>,
        window_minutes: u32,
    ) -> HealthStatus {
        self.snapshot_at(incidents, breakers, window_minutes, Utc::now())
    }

    /// Same as [`snapshot`](Self::snapshot) with an explicit clock
    ///
    /// Only incidents inside the window are copied out of the log.
    pub fn snapshot_at(
        &self,
        incidents: &IncidentLog,
        breakers: Vec<CircuitBreakerView>,
        window_minutes: u32,
        now: DateTime<Utc>,
    ) -> HealthStatus {
        let window = chrono::Duration::minutes(i64::from(window_minutes));
        let total_incidents = incidents.len();
        let recent = incidents.recent(window, now);

        let mut failures_by_kind = BTreeMap::new();
        for incident in &recent {
            *failures_by_kind.entry(incident.kind).or_insert(0) += 1;
        }

        let circuit_breakers = breakers
            .into_iter()
            .map(|view| (view.component.clone(), view))
            .collect();

        HealthStatus {
            overall_status: OverallStatus::from_recent_incidents(recent.len()),
            total_incidents,
            recent_incidents: recent.len(),
            failures_by_kind,
            circuit_breakers,
            monitoring_active: true,
            window_minutes,
            last_check: now,
        }
    }

    /// Recommendations and trends for a snapshot
    pub fn diagnose(&self, health: HealthStatus) -> Diagnosis {
        let recommendations: Vec<String> = match health.overall_status {
            OverallStatus::Critical => vec![
                "Investigate the root cause of recent incidents",
                "Consider restarting critical components",
                "Activate emergency mode",
            ],
            OverallStatus::Warning => vec![
                "Monitor the system more frequently",
                "Check logs of the affected components",
                "Prepare contingency plans",
            ],
            OverallStatus::Healthy => vec!["System operating normally"],
        }
        .into_iter()
        .map(String::from)
        .collect();

        let incident_frequency = if health.recent_incidents < HIGH_FREQUENCY_THRESHOLD {
            IncidentFrequency::Normal
        } else {
            IncidentFrequency::High
        };

        // BTreeMap iteration is ordered, so ties keep the first kind
        let most_common_failure = health
            .failures_by_kind
            .iter()
            .fold(None, |best: Option<(FailureKind, usize)>, (&kind, &count)| {
                match best {
                    Some((_, top)) if top >= count => best,
                    _ => Some((kind, count)),
                }
            })
            .map(|(kind, _)| kind);

        let circuit_breaker_trips = health
            .circuit_breakers
            .values()
            .filter(|view| view.state != CircuitState::Closed)
            .count();

        Diagnosis {
            recommendations,
            trends: HealthTrends {
                incident_frequency,
                most_common_failure,
                circuit_breaker_trips,
            },
            next_check_minutes: NEXT_CHECK_MINUTES,
            diagnosed_at: Utc::now(),
            health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use warden_core_resilience::{FailureIncident, IncidentContext, DEFAULT_INCIDENT_CAPACITY};

    fn incident_at(kind: FailureKind, minutes_ago: i64, now: DateTime<Utc>) -> FailureIncident {
        let mut incident =
            FailureIncident::new(kind, "scanner", "boom", "", IncidentContext::new(), 0);
        incident.timestamp = now - chrono::Duration::minutes(minutes_ago);
        incident
    }

    fn log_of(incidents: Vec<FailureIncident>) -> IncidentLog {
        let log = IncidentLog::new(DEFAULT_INCIDENT_CAPACITY);
        for incident in incidents {
            log.append(incident);
        }
        log
    }

    fn view(component: &str, state: CircuitState) -> CircuitBreakerView {
        CircuitBreakerView {
            component: component.to_string(),
            state,
            failure_count: 0,
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            last_failure_at: None,
        }
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(OverallStatus::from_recent_incidents(0), OverallStatus::Healthy);
        assert_eq!(OverallStatus::from_recent_incidents(1), OverallStatus::Warning);
        assert_eq!(OverallStatus::from_recent_incidents(4), OverallStatus::Warning);
        assert_eq!(OverallStatus::from_recent_incidents(5), OverallStatus::Critical);
        assert_eq!(OverallStatus::from_recent_incidents(500), OverallStatus::Critical);
    }

    #[test]
    fn test_empty_snapshot_is_healthy() {
        let health = HealthReporter::new().snapshot(&log_of(Vec::new()), Vec::new(), 60);
        assert_eq!(health.overall_status, OverallStatus::Healthy);
        assert_eq!(health.total_incidents, 0);
        assert!(health.failures_by_kind.is_empty());
        assert!(health.monitoring_active);
    }

    #[test]
    fn test_window_filters_old_incidents() {
        let now = Utc::now();
        let incidents = log_of(vec![
            incident_at(FailureKind::Timeout, 120, now),
            incident_at(FailureKind::Timeout, 60, now),
            incident_at(FailureKind::ApiError, 10, now),
            incident_at(FailureKind::ApiError, 1, now),
        ]);

        let health = HealthReporter::new().snapshot_at(&incidents, Vec::new(), 60, now);
        assert_eq!(health.total_incidents, 4);
        assert_eq!(health.recent_incidents, 2);
        assert_eq!(health.overall_status, OverallStatus::Warning);
        assert_eq!(health.failures_by_kind.get(&FailureKind::ApiError), Some(&2));
        assert!(!health.failures_by_kind.contains_key(&FailureKind::Timeout));
    }

    #[test]
    fn test_totals_follow_log_eviction() {
        let now = Utc::now();
        let log = IncidentLog::new(2);
        log.append(incident_at(FailureKind::Timeout, 1, now));
        log.append(incident_at(FailureKind::ApiError, 90, now));
        log.append(incident_at(FailureKind::ApiError, 2, now));

        let health = HealthReporter::new().snapshot_at(&log, Vec::new(), 60, now);
        assert_eq!(health.total_incidents, 2);
        assert_eq!(health.recent_incidents, 1);
        assert!(!health.failures_by_kind.contains_key(&FailureKind::Timeout));
    }

    #[test]
    fn test_breakers_keyed_by_component() {
        let health = HealthReporter::new().snapshot(
            &log_of(Vec::new()),
            vec![view("b", CircuitState::Open), view("a", CircuitState::Closed)],
            60,
        );
        let keys: Vec<&String> = health.circuit_breakers.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_diagnose_critical() {
        let now = Utc::now();
        let mut incidents: Vec<_> = (0..3)
            .map(|_| incident_at(FailureKind::NetworkError, 1, now))
            .collect();
        incidents.extend((0..2).map(|_| incident_at(FailureKind::Timeout, 1, now)));
        let incidents = log_of(incidents);

        let reporter = HealthReporter::new();
        let health = reporter.snapshot_at(
            &incidents,
            vec![
                view("geo", CircuitState::Open),
                view("maps", CircuitState::HalfOpen),
                view("auth", CircuitState::Closed),
            ],
            60,
            now,
        );
        let diagnosis = reporter.diagnose(health);

        assert_eq!(diagnosis.health.overall_status, OverallStatus::Critical);
        assert_eq!(diagnosis.recommendations.len(), 3);
        assert_eq!(diagnosis.trends.incident_frequency, IncidentFrequency::High);
        assert_eq!(
            diagnosis.trends.most_common_failure,
            Some(FailureKind::NetworkError)
        );
        assert_eq!(diagnosis.trends.circuit_breaker_trips, 2);
        assert_eq!(diagnosis.next_check_minutes, 15);
    }

    #[test]
    fn test_diagnose_healthy() {
        let reporter = HealthReporter::new();
        let health = reporter.snapshot(&log_of(Vec::new()), Vec::new(), 60);
        let diagnosis = reporter.diagnose(health);

        assert_eq!(diagnosis.recommendations, vec!["System operating normally"]);
        assert_eq!(diagnosis.trends.incident_frequency, IncidentFrequency::Normal);
        assert!(diagnosis.trends.most_common_failure.is_none());
        assert_eq!(diagnosis.trends.circuit_breaker_trips, 0);
    }

    #[test]
    fn test_most_common_tie_keeps_first_kind() {
        let now = Utc::now();
        let incidents = log_of(vec![
            incident_at(FailureKind::MemoryError, 1, now),
            incident_at(FailureKind::Timeout, 1, now),
        ]);
        let reporter = HealthReporter::new();
        let diagnosis = reporter.diagnose(reporter.snapshot_at(&incidents, Vec::new(), 60, now));
        assert_eq!(diagnosis.trends.most_common_failure, Some(FailureKind::Timeout));
    }

    #[test]
    fn test_health_json_uses_snake_case_keys() {
        let now = Utc::now();
        let incidents = log_of(vec![incident_at(FailureKind::ApiError, 1, now)]);
        let health = HealthReporter::new().snapshot_at(&incidents, Vec::new(), 60, now);
        let json = serde_json::to_value(&health).unwrap();

        assert_eq!(json["overall_status"], "warning");
        assert_eq!(json["failures_by_kind"]["api_error"], 1);
    }
}
