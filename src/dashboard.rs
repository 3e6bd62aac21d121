//! Dashboard aggregation over periodically polled feeds.
//!
//! The dashboard is split into panels, each fed by its own poller:
//!
//! - **fleet**: drifted vehicle telemetry (every 5 s by default)
//! - **forecasts**: live prediction-backend scores per vehicle (every 5 s)
//! - **reports**: agent activity and security alerts (every 10 s)
//! - **maintenance**: maintenance predictions and the appointment ledger
//!   (every 10 s)
//!
//! A poller runs at most one fetch at a time. If a fetch is still running
//! when its interval elapses it is dropped and recorded as a failure, so a
//! slow upstream can never deliver a result from a superseded cycle. On any
//! failure the panel keeps its last good data and exposes the error; the next
//! success clears it.
//!
//! # Usage
//!
//! ```ignore
//! let dashboard = Dashboard::new();
//! let cancel = CancellationToken::new();
//! dashboard.spawn_pollers(sources, intervals, cancel.clone());
//! let view = dashboard.view().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregation::{FleetSummary, ReportSummary, SeverityBuckets, highest_risk};
use crate::feeds::Feeds;
use crate::gateway::{PredictionClient, VehicleForecast};
use crate::model::{AgentActivity, Appointment, Prediction, SecurityAlert, Severity, Vehicle};
use crate::storage::Ledger;
use crate::telemetry::Telemetry;

/// Something a panel can poll.
#[async_trait]
pub trait Feed: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> anyhow::Result<Self::Output>;
}

/// One polled dashboard section.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel<T> {
    /// Last successfully fetched data, kept across failures.
    pub data: Option<T>,

    /// When `data` was fetched.
    pub last_updated: Option<DateTime<Utc>>,

    /// Error from the most recent poll, cleared by the next success.
    pub error: Option<String>,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            data: None,
            last_updated: None,
            error: None,
        }
    }
}

impl<T> Panel<T> {
    pub fn record_success(&mut self, data: T, at: DateTime<Utc>) {
        self.data = Some(data);
        self.last_updated = Some(at);
        self.error = None;
    }

    pub fn record_failure(&mut self, error: String) {
        self.error = Some(error);
    }

    /// Project the panel's data, keeping its timestamps and error.
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> Panel<U> {
        Panel {
            data: self.data.as_ref().map(f),
            last_updated: self.last_updated,
            error: self.error.clone(),
        }
    }
}

type SharedPanel<T> = Arc<RwLock<Panel<T>>>;

/// Run one fetch into `panel`, giving up after `deadline`.
pub async fn poll_once<F: Feed>(feed: &F, panel: &SharedPanel<F::Output>, deadline: Duration) {
    match tokio::time::timeout(deadline, feed.fetch()).await {
        Ok(Ok(data)) => {
            panel.write().await.record_success(data, Utc::now());
            debug!(feed = feed.name(), "Panel refreshed");
        }
        Ok(Err(e)) => {
            warn!(feed = feed.name(), error = %e, "Panel refresh failed");
            panel.write().await.record_failure(e.to_string());
        }
        Err(_) => {
            warn!(
                feed = feed.name(),
                deadline_ms = deadline.as_millis() as u64,
                "Panel refresh superseded"
            );
            panel
                .write()
                .await
                .record_failure(format!("{} refresh timed out", feed.name()));
        }
    }
}

/// Poll `feed` every `period` until `cancel` fires.
pub async fn run_poller<F: Feed>(
    feed: F,
    panel: SharedPanel<F::Output>,
    period: Duration,
    cancel: CancellationToken,
) {
    info!(
        feed = feed.name(),
        interval_ms = period.as_millis() as u64,
        "Poller started"
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = poll_once(&feed, &panel, period) => {}
                }
            }
        }
    }

    info!(feed = feed.name(), "Poller stopped");
}

/// Drifted fleet telemetry.
pub struct FleetFeed {
    pub telemetry: Telemetry,
}

#[async_trait]
impl Feed for FleetFeed {
    type Output = Vec<Vehicle>;

    fn name(&self) -> &'static str {
        "fleet"
    }

    async fn fetch(&self) -> anyhow::Result<Vec<Vehicle>> {
        Ok(self.telemetry.list())
    }
}

/// Live forecasts for the current fleet state.
pub struct ForecastFeed {
    pub telemetry: Telemetry,
    pub gateway: PredictionClient,
}

#[async_trait]
impl Feed for ForecastFeed {
    type Output = Vec<VehicleForecast>;

    fn name(&self) -> &'static str {
        "forecasts"
    }

    async fn fetch(&self) -> anyhow::Result<Vec<VehicleForecast>> {
        let vehicles = self.telemetry.snapshot();
        Ok(self.gateway.forecast_fleet(&vehicles).await)
    }
}

/// Agent and security log entries fetched together.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLog {
    pub agents: Vec<AgentActivity>,
    pub alerts: Vec<SecurityAlert>,
}

/// Agent activity and security alerts.
pub struct ReportFeed {
    pub feeds: Feeds,
}

#[async_trait]
impl Feed for ReportFeed {
    type Output = ActivityLog;

    fn name(&self) -> &'static str {
        "reports"
    }

    async fn fetch(&self) -> anyhow::Result<ActivityLog> {
        Ok(ActivityLog {
            agents: self.feeds.list_agents(),
            alerts: self.feeds.list_alerts(),
        })
    }
}

/// Maintenance predictions alongside the booked appointments.
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceLog {
    pub predictions: Vec<Prediction>,
    pub appointments: Vec<Appointment>,
}

/// Maintenance predictions and the appointment ledger.
pub struct MaintenanceFeed {
    pub feeds: Feeds,
    pub ledger: Ledger,
}

#[async_trait]
impl Feed for MaintenanceFeed {
    type Output = MaintenanceLog;

    fn name(&self) -> &'static str {
        "maintenance"
    }

    async fn fetch(&self) -> anyhow::Result<MaintenanceLog> {
        Ok(MaintenanceLog {
            predictions: self.feeds.list_predictions(),
            appointments: self.ledger.list().await?,
        })
    }
}

/// Everything the pollers read from.
#[derive(Clone)]
pub struct DashboardSources {
    pub telemetry: Telemetry,
    pub gateway: PredictionClient,
    pub feeds: Feeds,
    pub ledger: Ledger,
}

/// Poll periods per panel.
#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub fleet: Duration,
    pub forecasts: Duration,
    pub reports: Duration,
    pub maintenance: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            fleet: Duration::from_secs(5),
            forecasts: Duration::from_secs(5),
            reports: Duration::from_secs(10),
            maintenance: Duration::from_secs(10),
        }
    }
}

/// Fleet panel as served.
#[derive(Debug, Clone, Serialize)]
pub struct FleetOverview {
    pub summary: FleetSummary,
    pub vehicles: Vec<Vehicle>,
}

/// Forecast panel as served.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastOverview {
    pub buckets: SeverityBuckets,
    /// Highest risk among vehicles the backend could score.
    pub highest_risk: Option<Severity>,
    pub forecasts: Vec<VehicleForecast>,
}

/// Reports panel as served.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOverview {
    pub summary: ReportSummary,
    pub agents: Vec<AgentActivity>,
    pub alerts: Vec<SecurityAlert>,
}

/// Maintenance panel as served.
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceOverview {
    /// Prediction counts per severity.
    pub buckets: SeverityBuckets,
    pub predictions: Vec<Prediction>,
    pub appointments: Vec<Appointment>,
}

/// Dashboard API response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// When this response was generated.
    pub generated_at: DateTime<Utc>,
    pub fleet: Panel<FleetOverview>,
    pub forecasts: Panel<ForecastOverview>,
    pub reports: Panel<ReportOverview>,
    pub maintenance: Panel<MaintenanceOverview>,
}

/// Shared dashboard state.
#[derive(Clone, Default)]
pub struct Dashboard {
    fleet: SharedPanel<Vec<Vehicle>>,
    forecasts: SharedPanel<Vec<VehicleForecast>>,
    reports: SharedPanel<ActivityLog>,
    maintenance: SharedPanel<MaintenanceLog>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start one poller per panel. All stop when `cancel` fires.
    pub fn spawn_pollers(
        &self,
        sources: DashboardSources,
        intervals: PollIntervals,
        cancel: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(run_poller(
                FleetFeed {
                    telemetry: sources.telemetry.clone(),
                },
                self.fleet.clone(),
                intervals.fleet,
                cancel.clone(),
            )),
            tokio::spawn(run_poller(
                ForecastFeed {
                    telemetry: sources.telemetry,
                    gateway: sources.gateway,
                },
                self.forecasts.clone(),
                intervals.forecasts,
                cancel.clone(),
            )),
            tokio::spawn(run_poller(
                ReportFeed {
                    feeds: sources.feeds.clone(),
                },
                self.reports.clone(),
                intervals.reports,
                cancel.clone(),
            )),
            tokio::spawn(run_poller(
                MaintenanceFeed {
                    feeds: sources.feeds,
                    ledger: sources.ledger,
                },
                self.maintenance.clone(),
                intervals.maintenance,
                cancel,
            )),
        ]
    }

    /// Refresh every panel once, sequentially.
    pub async fn refresh(&self, sources: &DashboardSources, intervals: PollIntervals) {
        let fleet = FleetFeed {
            telemetry: sources.telemetry.clone(),
        };
        let forecasts = ForecastFeed {
            telemetry: sources.telemetry.clone(),
            gateway: sources.gateway.clone(),
        };
        let reports = ReportFeed {
            feeds: sources.feeds.clone(),
        };
        let maintenance = MaintenanceFeed {
            feeds: sources.feeds.clone(),
            ledger: sources.ledger.clone(),
        };

        poll_once(&fleet, &self.fleet, intervals.fleet).await;
        poll_once(&forecasts, &self.forecasts, intervals.forecasts).await;
        poll_once(&reports, &self.reports, intervals.reports).await;
        poll_once(&maintenance, &self.maintenance, intervals.maintenance).await;
    }

    /// Current panels with their derived counts.
    pub async fn view(&self) -> DashboardView {
        let fleet = self.fleet.read().await.map(|vehicles| FleetOverview {
            summary: FleetSummary::from_vehicles(vehicles),
            vehicles: vehicles.clone(),
        });

        let forecasts = self.forecasts.read().await.map(|forecasts| ForecastOverview {
            buckets: SeverityBuckets::from_forecasts(forecasts),
            highest_risk: highest_risk(forecasts),
            forecasts: forecasts.clone(),
        });

        let reports = self.reports.read().await.map(|log| ReportOverview {
            summary: ReportSummary::from_logs(&log.agents, &log.alerts),
            agents: log.agents.clone(),
            alerts: log.alerts.clone(),
        });

        let maintenance = self.maintenance.read().await.map(|log| MaintenanceOverview {
            buckets: SeverityBuckets::from_predictions(&log.predictions),
            predictions: log.predictions.clone(),
            appointments: log.appointments.clone(),
        });

        DashboardView {
            generated_at: Utc::now(),
            fleet,
            forecasts,
            reports,
            maintenance,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::BookingRequest;

    /// Succeeds on the first call, fails on every later one.
    struct FlakyFeed {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Feed for FlakyFeed {
        type Output = u32;

        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch(&self) -> anyhow::Result<u32> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(7),
                _ => anyhow::bail!("upstream returned 503"),
            }
        }
    }

    /// Never finishes within any reasonable deadline.
    struct StuckFeed;

    #[async_trait]
    impl Feed for StuckFeed {
        type Output = u32;

        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn fetch(&self) -> anyhow::Result<u32> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(1)
        }
    }

    fn offline_sources() -> DashboardSources {
        DashboardSources {
            telemetry: Telemetry::seeded(),
            gateway: PredictionClient::new("http://127.0.0.1:9", Some(Duration::from_secs(1)))
                .unwrap(),
            feeds: Feeds::seeded(Utc::now()),
            ledger: Ledger::seeded(),
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_last_known_good() {
        let feed = FlakyFeed {
            calls: AtomicUsize::new(0),
        };
        let panel: SharedPanel<u32> = Arc::default();

        poll_once(&feed, &panel, Duration::from_secs(1)).await;
        let first_update = panel.read().await.last_updated;
        assert_eq!(panel.read().await.data, Some(7));
        assert!(panel.read().await.error.is_none());

        poll_once(&feed, &panel, Duration::from_secs(1)).await;
        let panel = panel.read().await;
        assert_eq!(panel.data, Some(7));
        assert_eq!(panel.last_updated, first_update);
        assert_eq!(panel.error.as_deref(), Some("upstream returned 503"));
    }

    #[tokio::test]
    async fn test_success_clears_error() {
        let mut panel = Panel::default();
        panel.record_failure("boom".to_string());
        panel.record_success(3, Utc::now());

        assert_eq!(panel.data, Some(3));
        assert!(panel.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_is_superseded() {
        let panel: SharedPanel<u32> = Arc::default();

        poll_once(&StuckFeed, &panel, Duration::from_secs(5)).await;

        let panel = panel.read().await;
        assert!(panel.data.is_none());
        assert_eq!(panel.error.as_deref(), Some("stuck refresh timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_stops_on_cancel() {
        let panel: SharedPanel<u32> = Arc::default();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_poller(
            StuckFeed,
            panel.clone(),
            Duration::from_secs(5),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        // The in-flight fetch was dropped, not recorded.
        assert!(panel.read().await.error.is_none());
    }

    #[tokio::test]
    async fn test_view_before_first_poll_is_empty() {
        let view = Dashboard::new().view().await;

        assert!(view.fleet.data.is_none());
        assert!(view.forecasts.data.is_none());
        assert!(view.reports.data.is_none());
        assert!(view.maintenance.data.is_none());
    }

    #[tokio::test]
    async fn test_refresh_populates_all_panels() {
        let dashboard = Dashboard::new();
        dashboard
            .refresh(&offline_sources(), PollIntervals::default())
            .await;

        let view = dashboard.view().await;

        let fleet = view.fleet.data.unwrap();
        assert_eq!(fleet.summary.total, 4);
        assert_eq!(fleet.vehicles.len(), 4);

        // Backend is offline: every vehicle is unavailable and none is bucketed.
        let forecasts = view.forecasts.data.unwrap();
        assert_eq!(forecasts.buckets.unavailable, 4);
        assert_eq!(forecasts.buckets.scored(), 0);
        assert_eq!(forecasts.highest_risk, None);

        let reports = view.reports.data.unwrap();
        assert_eq!(reports.summary.running_agents, 2);
        assert_eq!(reports.summary.high_severity_alerts, 2);

        let maintenance = view.maintenance.data.unwrap();
        assert_eq!(maintenance.predictions.len(), 4);
        assert_eq!(maintenance.buckets.high, 1);
        assert_eq!(maintenance.buckets.medium, 2);
        assert_eq!(maintenance.buckets.low, 1);
        assert_eq!(maintenance.appointments.len(), 2);
    }

    #[tokio::test]
    async fn test_maintenance_panel_tracks_new_bookings() {
        let sources = offline_sources();
        let dashboard = Dashboard::new();
        dashboard.refresh(&sources, PollIntervals::default()).await;

        sources
            .ledger
            .create(BookingRequest {
                vehicle_id: "V003".to_string(),
                vehicle_name: "Maruti Swift".to_string(),
                service_type: "Brake Service".to_string(),
                date: "2026-01-10".to_string(),
                time: "10:30".to_string(),
            })
            .await
            .unwrap();

        let before = dashboard.view().await.maintenance.data.unwrap();
        assert_eq!(before.appointments.len(), 2);

        dashboard.refresh(&sources, PollIntervals::default()).await;
        let after = dashboard.view().await.maintenance.data.unwrap();
        assert_eq!(after.appointments.len(), 3);
        assert_eq!(after.appointments[2].vehicle_id, "V003");
    }
}
