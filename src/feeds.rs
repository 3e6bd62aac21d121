//! Read-only activity feeds: agent activity, security alerts and the static
//! predictive-maintenance list.
//!
//! All three are seeded once at startup. Timestamps are relative to the seed
//! time so a fresh process always shows recent activity.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::model::{
    AgentActivity, AgentClass, AgentStatus, Prediction, SecurityAlert, Severity,
};

/// Static feeds shared across handlers.
#[derive(Clone)]
pub struct Feeds {
    agents: Arc<[AgentActivity]>,
    alerts: Arc<[SecurityAlert]>,
    predictions: Arc<[Prediction]>,
}

impl Feeds {
    pub fn new(
        agents: Vec<AgentActivity>,
        alerts: Vec<SecurityAlert>,
        predictions: Vec<Prediction>,
    ) -> Self {
        Self {
            agents: agents.into(),
            alerts: alerts.into(),
            predictions: predictions.into(),
        }
    }

    /// Feeds populated with the demo data, timestamped relative to `now`.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        Self::new(seed_agents(now), seed_alerts(now), seed_predictions())
    }

    pub fn list_agents(&self) -> Vec<AgentActivity> {
        self.agents.to_vec()
    }

    pub fn list_alerts(&self) -> Vec<SecurityAlert> {
        self.alerts.to_vec()
    }

    pub fn list_predictions(&self) -> Vec<Prediction> {
        self.predictions.to_vec()
    }
}

fn seed_agents(now: DateTime<Utc>) -> Vec<AgentActivity> {
    [
        (
            "A001",
            AgentClass::Master,
            "Fleet Orchestrator",
            "Started vehicle health scan",
            Duration::minutes(2),
            AgentStatus::Completed,
        ),
        (
            "A002",
            AgentClass::Worker,
            "Telemetry Collector",
            "Fetched data from 4 vehicles",
            Duration::minutes(1),
            AgentStatus::Completed,
        ),
        (
            "A003",
            AgentClass::Worker,
            "Prediction Engine",
            "Analyzed vibration patterns",
            Duration::seconds(30),
            AgentStatus::Running,
        ),
        (
            "A004",
            AgentClass::Master,
            "Alert Manager",
            "Dispatched 2 critical alerts",
            Duration::seconds(15),
            AgentStatus::Running,
        ),
    ]
    .into_iter()
    .map(|(id, class, name, action, age, status)| AgentActivity {
        id: id.to_string(),
        class,
        name: name.to_string(),
        action: action.to_string(),
        timestamp: now - age,
        status,
    })
    .collect()
}

fn seed_alerts(now: DateTime<Utc>) -> Vec<SecurityAlert> {
    [
        (
            "U001",
            "Scheduling Agent attempted unauthorized access",
            Severity::High,
            5,
            "Scheduling Agent",
        ),
        (
            "U002",
            "Unusual data request pattern detected",
            Severity::Medium,
            15,
            "Telemetry Service",
        ),
        (
            "U003",
            "Multiple failed authentication attempts",
            Severity::High,
            30,
            "API Gateway",
        ),
        (
            "U004",
            "Anomalous query execution time detected",
            Severity::Low,
            45,
            "Database Monitor",
        ),
    ]
    .into_iter()
    .map(|(id, message, severity, minutes_ago, source)| SecurityAlert {
        id: id.to_string(),
        message: message.to_string(),
        severity,
        timestamp: now - Duration::minutes(minutes_ago),
        source: source.to_string(),
    })
    .collect()
}

fn seed_predictions() -> Vec<Prediction> {
    [
        ("P001", "V001", "Hero Xtreme", "Brake pad wear", 89, 12, Severity::Medium),
        ("P002", "V003", "Maruti Swift", "Engine overheating", 94, 3, Severity::High),
        ("P003", "V003", "Maruti Swift", "Transmission fluid", 76, 7, Severity::Medium),
        ("P004", "V002", "M&M Thar", "Battery degradation", 82, 20, Severity::Low),
    ]
    .into_iter()
    .map(
        |(id, vehicle_id, vehicle_name, failure_type, confidence, days, severity)| Prediction {
            id: id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            vehicle_name: vehicle_name.to_string(),
            failure_type: failure_type.to_string(),
            confidence,
            days_until_maintenance: days,
            severity,
        },
    )
    .collect()
}
