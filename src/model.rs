//! Data models for Fleetwatch.
//!
//! Wire names follow the dashboard's JSON contract (`camelCase` fields,
//! lowercase enum values). The one piece of logic that lives here is the
//! vehicle health rule in [`VehicleStatus::from_readings`]; every caller that
//! needs a status goes through it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Brake health below this is critical.
pub const BRAKE_CRITICAL_BELOW: f64 = 70.0;

/// Brake health below this (but not critical) is a warning.
pub const BRAKE_WARNING_BELOW: f64 = 80.0;

/// Engine temperature above this is critical.
pub const ENGINE_CRITICAL_ABOVE: f64 = 100.0;

/// Health classification of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Healthy,
    Warning,
    Critical,
}

impl VehicleStatus {
    /// Derive status from the readings that matter.
    ///
    /// # Thresholds
    ///
    /// - `critical`: brake_health < 70 or engine_temp > 100
    /// - `warning`: brake_health < 80
    /// - `healthy`: otherwise
    pub fn from_readings(engine_temp: f64, brake_health: f64) -> Self {
        if brake_health < BRAKE_CRITICAL_BELOW || engine_temp > ENGINE_CRITICAL_ABOVE {
            VehicleStatus::Critical
        } else if brake_health < BRAKE_WARNING_BELOW {
            VehicleStatus::Warning
        } else {
            VehicleStatus::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Healthy => "healthy",
            VehicleStatus::Warning => "warning",
            VehicleStatus::Critical => "critical",
        }
    }
}

/// Raw sensor readings for one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readings {
    /// Engine temperature in °C.
    pub engine_temp: f64,
    /// Brake health in percent.
    pub brake_health: f64,
    /// Battery health in percent.
    pub battery: f64,
    /// Vibration in mm/s.
    pub vibration: f64,
}

/// A fleet vehicle with its latest readings.
///
/// `status` is private: the only way to change readings is
/// [`Vehicle::update_readings`], which recomputes it, so the status can never
/// disagree with the readings that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    readings: Readings,
    pub last_maintenance: NaiveDate,
    status: VehicleStatus,
}

impl Vehicle {
    pub fn new(id: &str, name: &str, readings: Readings, last_maintenance: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: VehicleStatus::from_readings(readings.engine_temp, readings.brake_health),
            readings,
            last_maintenance,
        }
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    /// Apply `f` to the readings and recompute the status.
    pub fn update_readings(&mut self, f: impl FnOnce(&mut Readings)) {
        f(&mut self.readings);
        self.status =
            VehicleStatus::from_readings(self.readings.engine_temp, self.readings.brake_health);
    }
}

/// Three-valued risk classification shared by predictions, forecasts and
/// security alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A static predictive-maintenance alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: String,
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub failure_type: String,
    /// Model confidence, 0-100.
    pub confidence: u8,
    pub days_until_maintenance: u32,
    pub severity: Severity,
}

/// Booking state of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            other => anyhow::bail!("unknown appointment status '{other}'"),
        }
    }
}

/// A maintenance booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub vehicle_id: String,
    /// Denormalized from the vehicle at booking time.
    pub vehicle_name: String,
    pub service_type: String,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
}

/// Request body for POST /schedule.
///
/// Missing and `null` fields deserialize to empty strings so that presence is
/// checked by validation (400 with a message) instead of failing JSON
/// extraction.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    #[serde(deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "vehicleId is required"))]
    pub vehicle_id: String,

    /// May be blank; the booking form fills it from the vehicle picker.
    #[serde(deserialize_with = "null_as_empty")]
    pub vehicle_name: String,

    #[serde(deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "serviceType is required"))]
    pub service_type: String,

    #[serde(deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "date is required"))]
    pub date: String,

    #[serde(deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "time is required"))]
    pub time: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of automation agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentClass {
    #[serde(rename = "Master Agent")]
    Master,
    #[serde(rename = "Worker Agent")]
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Running,
    Completed,
}

/// One entry in the agent activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub class: AgentClass,
    pub name: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub status: AgentStatus,
}

/// A behavioural anomaly alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Response for GET /vehicles.
#[derive(Debug, Serialize)]
pub struct VehiclesResponse {
    pub vehicles: Vec<Vehicle>,
}

/// Query parameters for GET /vehicles.
#[derive(Debug, Default, Deserialize)]
pub struct VehiclesQuery {
    /// Restrict to one status; absent or `all` returns every vehicle.
    pub status: Option<String>,
}

/// Response for GET /predict.
#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<Prediction>,
}

/// Response for GET /schedule.
#[derive(Debug, Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

/// Response for POST /schedule.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub message: String,
    pub appointment: Appointment,
}

/// Response for GET /agents.
#[derive(Debug, Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentActivity>,
}

/// Response for GET /ueba.
#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<SecurityAlert>,
}
