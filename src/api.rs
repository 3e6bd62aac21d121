//! HTTP API handlers for Fleetwatch.
//!
//! All routes speak JSON and require no authentication.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::aggregation::{SeverityBuckets, filter_by_status, highest_risk, parse_status_filter};
use crate::dashboard::{Dashboard, DashboardView};
use crate::error::{AppError, AppResult};
use crate::feeds::Feeds;
use crate::gateway::{PredictionClient, VehicleForecast};
use crate::model::{
    AgentsResponse, AlertsResponse, AppointmentsResponse, BookingRequest, BookingResponse,
    PredictionsResponse, Severity, VehiclesQuery, VehiclesResponse,
};
use crate::storage::Ledger;
use crate::telemetry::Telemetry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub telemetry: Telemetry,
    pub ledger: Ledger,
    pub feeds: Feeds,
    pub gateway: PredictionClient,
    pub dashboard: Dashboard,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/vehicles", get(get_vehicles))
        .route("/predict", get(get_predictions))
        .route("/schedule", get(get_schedule).post(post_schedule))
        .route("/agents", get(get_agents))
        .route("/ueba", get(get_alerts))
        .route("/forecasts", get(get_forecasts))
        .route("/dashboard", get(get_dashboard))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// GET /vehicles - Advance the simulation one step and return the fleet.
///
/// # Query Parameters
///
/// - `status` (optional): `all`, `healthy`, `warning` or `critical`
///
/// Drift is applied to every vehicle regardless of the filter.
#[instrument(skip(state))]
pub async fn get_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehiclesQuery>,
) -> AppResult<Json<VehiclesResponse>> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => parse_status_filter(raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown status filter '{raw}'")))?,
    };

    let vehicles = filter_by_status(state.telemetry.list(), status);
    info!(
        count = vehicles.len(),
        filter = status.map_or("all", |s| s.as_str()),
        "Vehicles polled"
    );

    Ok(Json(VehiclesResponse { vehicles }))
}

/// GET /predict - Static predictive-maintenance alerts.
#[instrument(skip(state))]
pub async fn get_predictions(State(state): State<AppState>) -> Json<PredictionsResponse> {
    Json(PredictionsResponse {
        predictions: state.feeds.list_predictions(),
    })
}

/// GET /schedule - All booked appointments.
#[instrument(skip(state))]
pub async fn get_schedule(State(state): State<AppState>) -> AppResult<Json<AppointmentsResponse>> {
    let appointments = state.ledger.list().await?;
    Ok(Json(AppointmentsResponse { appointments }))
}

/// POST /schedule - Book an appointment.
///
/// # Request Body
///
/// ```json
/// {
///     "vehicleId": "V001",
///     "vehicleName": "Hero Xtreme",
///     "serviceType": "Regular Maintenance",
///     "date": "2025-12-20",
///     "time": "09:00"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the stored, confirmed appointment. A blank, `null` or
/// missing required field yields `400 VALIDATION_ERROR`; a body that is not
/// a JSON object of strings yields `400 BAD_REQUEST`. Nothing is stored in
/// either case.
#[instrument(skip(state, payload))]
pub async fn post_schedule(
    State(state): State<AppState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let appointment = state.ledger.create(request).await?;

    info!(
        appointment_id = %appointment.id,
        vehicle_id = %appointment.vehicle_id,
        date = %appointment.date,
        time = %appointment.time,
        "Appointment booked"
    );

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            message: "Appointment booked".to_string(),
            appointment,
        }),
    ))
}

/// GET /agents - Agent activity log.
#[instrument(skip(state))]
pub async fn get_agents(State(state): State<AppState>) -> Json<AgentsResponse> {
    Json(AgentsResponse {
        agents: state.feeds.list_agents(),
    })
}

/// GET /ueba - Security alerts.
#[instrument(skip(state))]
pub async fn get_alerts(State(state): State<AppState>) -> Json<AlertsResponse> {
    Json(AlertsResponse {
        alerts: state.feeds.list_alerts(),
    })
}

/// Response for GET /forecasts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastsResponse {
    pub forecasts: Vec<VehicleForecast>,
    pub buckets: SeverityBuckets,
    pub highest_risk: Option<Severity>,
}

/// GET /forecasts - Score the current fleet with the prediction backend.
///
/// Never fails: vehicles the backend could not score come back as
/// `{"state": "unavailable"}` and are counted separately in `buckets`.
#[instrument(skip(state))]
pub async fn get_forecasts(State(state): State<AppState>) -> Json<ForecastsResponse> {
    let vehicles = state.telemetry.snapshot();
    let forecasts = state.gateway.forecast_fleet(&vehicles).await;
    let buckets = SeverityBuckets::from_forecasts(&forecasts);
    let highest_risk = highest_risk(&forecasts);

    info!(
        scored = buckets.scored(),
        unavailable = buckets.unavailable,
        "Forecasts computed"
    );

    Json(ForecastsResponse {
        forecasts,
        buckets,
        highest_risk,
    })
}

/// GET /dashboard - Polled panels with derived counts.
#[instrument(skip(state))]
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.dashboard.view().await)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
