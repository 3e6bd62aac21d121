//! Client for the external predictive-maintenance backend.
//!
//! The backend scores one vehicle at a time:
//!
//! ```text
//! POST {base_url}/predict
//! {"vehicle_id": "V001", "engine_temp": 85.0, "brake_health": 80.0,
//!  "battery_health": 90.0, "vibration_level": 5.0}
//!
//! 200 {"predicted_risk": "medium", "confidence_score": 0.87, ...}
//! ```
//!
//! The backend is treated as unreliable. [`PredictionClient::predict`] never
//! fails: transport errors, non-2xx responses and malformed payloads all come
//! back as [`Forecast::Unavailable`], and callers render that state instead of
//! propagating an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::model::{Severity, Vehicle};

/// Default prediction backend address.
pub const DEFAULT_PREDICTION_URL: &str = "http://127.0.0.1:8000";

/// Why a prediction could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("prediction backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("prediction backend returned HTTP {0}")]
    Status(u16),

    #[error("malformed prediction payload: {0}")]
    Malformed(String),
}

/// Metrics sent to the backend for one vehicle.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleMetrics {
    pub vehicle_id: String,
    pub engine_temp: f64,
    pub brake_health: f64,
    pub battery_health: f64,
    pub vibration_level: f64,
}

impl From<&Vehicle> for VehicleMetrics {
    fn from(vehicle: &Vehicle) -> Self {
        let r = vehicle.readings();
        Self {
            vehicle_id: vehicle.id.clone(),
            engine_temp: r.engine_temp,
            brake_health: r.brake_health,
            battery_health: r.battery,
            vibration_level: r.vibration,
        }
    }
}

/// Raw backend response. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct ScoreResponse {
    predicted_risk: Severity,
    confidence_score: f64,
}

/// Outcome of scoring one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Forecast {
    Available {
        risk: Severity,
        /// Confidence in percent, 0-100.
        confidence: f64,
    },
    Unavailable,
}

impl Forecast {
    pub fn risk(&self) -> Option<Severity> {
        match self {
            Forecast::Available { risk, .. } => Some(*risk),
            Forecast::Unavailable => None,
        }
    }
}

/// A forecast tagged with the vehicle it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleForecast {
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub forecast: Forecast,
}

/// Client for the prediction backend.
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    /// Create a client for `base_url`, optionally bounding each request.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Score one vehicle, degrading every failure to [`Forecast::Unavailable`].
    pub async fn predict(&self, metrics: &VehicleMetrics) -> Forecast {
        match self.try_predict(metrics).await {
            Ok(forecast) => {
                debug!(vehicle_id = %metrics.vehicle_id, ?forecast, "Prediction received");
                forecast
            }
            Err(e) => {
                warn!(
                    vehicle_id = %metrics.vehicle_id,
                    error = %e,
                    "Prediction unavailable"
                );
                Forecast::Unavailable
            }
        }
    }

    /// Score one vehicle, surfacing the failure reason.
    pub async fn try_predict(&self, metrics: &VehicleMetrics) -> Result<Forecast, GatewayError> {
        let url = format!("{}/predict", self.base_url);

        let response = self.client.post(&url).json(metrics).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body = response
            .json::<ScoreResponse>()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        Ok(Forecast::Available {
            risk: body.predicted_risk,
            confidence: normalize_confidence(body.confidence_score)?,
        })
    }

    /// Score every vehicle concurrently. Results are ordered by vehicle id.
    pub async fn forecast_fleet(&self, vehicles: &[Vehicle]) -> Vec<VehicleForecast> {
        let mut tasks = JoinSet::new();

        for vehicle in vehicles {
            let client = self.clone();
            let metrics = VehicleMetrics::from(vehicle);
            let vehicle_name = vehicle.name.clone();
            tasks.spawn(async move {
                let forecast = client.predict(&metrics).await;
                VehicleForecast {
                    vehicle_id: metrics.vehicle_id,
                    vehicle_name,
                    forecast,
                }
            });
        }

        let mut forecasts = Vec::with_capacity(vehicles.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(forecast) => forecasts.push(forecast),
                Err(e) => warn!(error = %e, "Prediction task failed"),
            }
        }

        forecasts.sort_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id));
        forecasts
    }
}

/// Convert a backend confidence into percent.
///
/// Values in `[0, 1]` are probabilities, values in `(1, 100]` are already
/// percentages. Anything else is rejected.
pub fn normalize_confidence(raw: f64) -> Result<f64, GatewayError> {
    if !raw.is_finite() || raw < 0.0 || raw > 100.0 {
        return Err(GatewayError::Malformed(format!(
            "confidence_score out of range: {raw}"
        )));
    }

    let percent = if raw <= 1.0 { raw * 100.0 } else { raw };
    Ok((percent * 10.0).round() / 10.0)
}
