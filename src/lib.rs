//! Fleetwatch - fleet health monitoring with predictive-maintenance scoring.
//!
//! # Overview
//!
//! Fleetwatch serves simulated vehicle telemetry, maintenance predictions,
//! an appointment ledger and agent/security activity logs over a small JSON
//! API. Vehicle readings drift a little on every poll to mimic a live fleet,
//! and an external prediction backend scores each vehicle's risk. The backend
//! is optional: when it is down every vehicle is reported as unavailable and
//! the rest of the service carries on.
//!
//! # Modules
//!
//! - [`model`]: Data types and the vehicle health rule
//! - [`telemetry`]: Vehicle store with simulated drift
//! - [`gateway`]: Prediction backend client
//! - [`storage`]: Append-only appointment ledger (memory or SQLite)
//! - [`feeds`]: Static agent, alert and prediction feeds
//! - [`aggregation`]: Derived dashboard counts
//! - [`dashboard`]: Periodic pollers and last-known-good panels
//! - [`api`]: HTTP API handlers
//! - [`config`]: Environment configuration
//! - [`error`]: HTTP error responses

pub mod aggregation;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feeds;
pub mod gateway;
pub mod model;
pub mod storage;
pub mod telemetry;
