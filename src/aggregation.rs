//! Derived counts shown on the dashboard.
//!
//! Everything here is a pure function of the lists it is given. Live
//! forecasts that came back unavailable are counted on their own and never
//! land in a severity bucket.

use serde::Serialize;

use crate::gateway::{Forecast, VehicleForecast};
use crate::model::{
    AgentActivity, AgentStatus, Prediction, SecurityAlert, Severity, Vehicle, VehicleStatus,
};

/// Vehicle counts by health status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

impl FleetSummary {
    pub fn from_vehicles(vehicles: &[Vehicle]) -> Self {
        let mut summary = Self {
            total: vehicles.len(),
            ..Self::default()
        };

        for vehicle in vehicles {
            match vehicle.status() {
                VehicleStatus::Healthy => summary.healthy += 1,
                VehicleStatus::Warning => summary.warning += 1,
                VehicleStatus::Critical => summary.critical += 1,
            }
        }

        summary
    }
}

/// Counts per severity, plus entries that had no severity to count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityBuckets {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub unavailable: usize,
}

impl SeverityBuckets {
    fn add(&mut self, severity: Option<Severity>) {
        match severity {
            Some(Severity::Low) => self.low += 1,
            Some(Severity::Medium) => self.medium += 1,
            Some(Severity::High) => self.high += 1,
            None => self.unavailable += 1,
        }
    }

    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let mut buckets = Self::default();
        for prediction in predictions {
            buckets.add(Some(prediction.severity));
        }
        buckets
    }

    pub fn from_forecasts(forecasts: &[VehicleForecast]) -> Self {
        let mut buckets = Self::default();
        for entry in forecasts {
            buckets.add(entry.forecast.risk());
        }
        buckets
    }

    /// Number of entries that landed in a severity bucket.
    pub fn scored(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Agent and security-alert counts for the reports view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_agents: usize,
    pub running_agents: usize,
    pub total_alerts: usize,
    pub high_severity_alerts: usize,
}

impl ReportSummary {
    pub fn from_logs(agents: &[AgentActivity], alerts: &[SecurityAlert]) -> Self {
        Self {
            total_agents: agents.len(),
            running_agents: agents
                .iter()
                .filter(|a| a.status == AgentStatus::Running)
                .count(),
            total_alerts: alerts.len(),
            high_severity_alerts: alerts
                .iter()
                .filter(|a| a.severity == Severity::High)
                .count(),
        }
    }
}

/// Parse a status filter. `None` means no filtering.
pub fn parse_status_filter(filter: &str) -> Option<Option<VehicleStatus>> {
    match filter {
        "all" => Some(None),
        "healthy" => Some(Some(VehicleStatus::Healthy)),
        "warning" => Some(Some(VehicleStatus::Warning)),
        "critical" => Some(Some(VehicleStatus::Critical)),
        _ => None,
    }
}

/// Keep only vehicles with the given status, or all of them.
pub fn filter_by_status(vehicles: Vec<Vehicle>, status: Option<VehicleStatus>) -> Vec<Vehicle> {
    match status {
        Some(status) => vehicles.into_iter().filter(|v| v.status() == status).collect(),
        None => vehicles,
    }
}

/// Highest risk among the available forecasts.
pub fn highest_risk(forecasts: &[VehicleForecast]) -> Option<Severity> {
    forecasts
        .iter()
        .filter_map(|f| match f.forecast {
            Forecast::Available { risk, .. } => Some(risk),
            Forecast::Unavailable => None,
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::Feeds;
    use crate::telemetry::seed_vehicles;
    use chrono::Utc;

    fn forecast(vehicle_id: &str, forecast: Forecast) -> VehicleForecast {
        VehicleForecast {
            vehicle_id: vehicle_id.to_string(),
            vehicle_name: format!("Vehicle {vehicle_id}"),
            forecast,
        }
    }

    #[test]
    fn test_fleet_summary_from_seed() {
        let summary = FleetSummary::from_vehicles(&seed_vehicles());

        assert_eq!(
            summary,
            FleetSummary {
                total: 4,
                healthy: 2,
                warning: 1,
                critical: 1,
            }
        );
    }

    #[test]
    fn test_report_summary_from_seed() {
        let feeds = Feeds::seeded(Utc::now());
        let summary = ReportSummary::from_logs(&feeds.list_agents(), &feeds.list_alerts());

        assert_eq!(summary.total_agents, 4);
        assert_eq!(summary.running_agents, 2);
        assert_eq!(summary.total_alerts, 4);
        assert_eq!(summary.high_severity_alerts, 2);
    }

    #[test]
    fn test_prediction_buckets_from_seed() {
        let predictions = Feeds::seeded(Utc::now()).list_predictions();
        let buckets = SeverityBuckets::from_predictions(&predictions);

        assert_eq!(buckets.low, 1);
        assert_eq!(buckets.medium, 2);
        assert_eq!(buckets.high, 1);
        assert_eq!(buckets.unavailable, 0);
    }

    #[test]
    fn test_unavailable_forecasts_are_excluded_from_severity() {
        let forecasts = vec![
            forecast(
                "V001",
                Forecast::Available {
                    risk: Severity::High,
                    confidence: 90.0,
                },
            ),
            forecast("V002", Forecast::Unavailable),
            forecast(
                "V003",
                Forecast::Available {
                    risk: Severity::Low,
                    confidence: 60.0,
                },
            ),
            forecast("V004", Forecast::Unavailable),
        ];

        let buckets = SeverityBuckets::from_forecasts(&forecasts);
        assert_eq!(buckets.high, 1);
        assert_eq!(buckets.low, 1);
        assert_eq!(buckets.unavailable, 2);
        assert_eq!(buckets.scored(), 2);
        assert_eq!(highest_risk(&forecasts), Some(Severity::High));
    }

    #[test]
    fn test_highest_risk_all_unavailable() {
        let forecasts = vec![forecast("V001", Forecast::Unavailable)];
        assert_eq!(highest_risk(&forecasts), None);
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(parse_status_filter("all"), Some(None));
        assert_eq!(
            parse_status_filter("critical"),
            Some(Some(VehicleStatus::Critical))
        );
        assert_eq!(parse_status_filter("broken"), None);

        let critical = filter_by_status(seed_vehicles(), Some(VehicleStatus::Critical));
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, "V003");

        assert_eq!(filter_by_status(seed_vehicles(), None).len(), 4);
    }
}
