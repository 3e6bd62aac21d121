//! Fleetwatch - fleet health monitoring with predictive-maintenance scoring.
//!
//! # API Endpoints
//!
//! - `GET /vehicles` - Fleet telemetry (advances the drift simulation)
//! - `GET /predict` - Predictive-maintenance alerts
//! - `GET /schedule` - Booked appointments
//! - `POST /schedule` - Book an appointment
//! - `GET /agents` - Agent activity log
//! - `GET /ueba` - Security alerts
//! - `GET /forecasts` - Live risk scores from the prediction backend
//! - `GET /dashboard` - Polled panels with derived counts
//! - `GET /health` - Health check

use std::net::SocketAddr;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fleetwatch::api::{AppState, router};
use fleetwatch::config::Config;
use fleetwatch::dashboard::{Dashboard, DashboardSources};
use fleetwatch::feeds::Feeds;
use fleetwatch::gateway::PredictionClient;
use fleetwatch::storage::Ledger;
use fleetwatch::telemetry::Telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("fleetwatch=info".parse()?))
        .init();

    // Load configuration from environment
    let config = Config::from_env()?;

    info!(
        port = config.port,
        prediction_url = %config.prediction_url,
        persistent_ledger = config.database_url.is_some(),
        "Starting Fleetwatch server"
    );

    // Initialize fleet, feeds, prediction client and ledger
    let telemetry = Telemetry::seeded();
    let feeds = Feeds::seeded(Utc::now());
    let gateway = PredictionClient::new(&config.prediction_url, config.prediction_timeout)?;
    let ledger = Ledger::open(config.database_url.as_deref()).await?;
    let dashboard = Dashboard::new();

    // Start dashboard pollers
    let cancel = CancellationToken::new();
    let pollers = dashboard.spawn_pollers(
        DashboardSources {
            telemetry: telemetry.clone(),
            gateway: gateway.clone(),
            feeds: feeds.clone(),
            ledger: ledger.clone(),
        },
        config.poll_intervals,
        cancel.clone(),
    );

    // Create application state
    let state = AppState {
        telemetry,
        ledger,
        feeds,
        gateway,
        dashboard,
    };

    // Build router
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Fleetwatch is listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    // Wait for pollers to drain
    cancel.cancel();
    for poller in pollers {
        poller.await?;
    }

    info!("Fleetwatch stopped");
    Ok(())
}
