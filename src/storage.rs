//! Appointment ledger storage.
//!
//! The ledger is append-only: bookings can be listed and created, never
//! updated or removed. Two backends implement [`AppointmentLedger`]:
//!
//! - [`MemoryLedger`]: a vector in process memory, lost on restart (default)
//! - [`SqliteLedger`]: a SQLite table via sqlx, durable when pointed at a file
//!
//! [`Ledger`] sits on top of either and owns the booking rules.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::model::{Appointment, AppointmentStatus, BookingRequest};

/// Append-only appointment storage.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    /// All appointments in insertion order.
    async fn list(&self) -> anyhow::Result<Vec<Appointment>>;

    /// Store a new appointment.
    async fn append(&self, appointment: &Appointment) -> anyhow::Result<()>;
}

/// In-process ledger.
#[derive(Default)]
pub struct MemoryLedger {
    appointments: RwLock<Vec<Appointment>>,
}

impl MemoryLedger {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        Self {
            appointments: RwLock::new(appointments),
        }
    }
}

#[async_trait]
impl AppointmentLedger for MemoryLedger {
    async fn list(&self) -> anyhow::Result<Vec<Appointment>> {
        Ok(self.appointments.read().await.clone())
    }

    async fn append(&self, appointment: &Appointment) -> anyhow::Result<()> {
        self.appointments.write().await.push(appointment.clone());
        Ok(())
    }
}

/// SQLite-backed ledger.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Connect, create the schema and insert any missing seed rows.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:fleetwatch.db?mode=rwc" or "sqlite::memory:")
    /// * `seed` - Appointments to insert if their ids are not present yet
    pub async fn new(database_url: &str, seed: &[Appointment]) -> anyhow::Result<Self> {
        let options = if database_url.contains(":memory:") {
            // Every connection to :memory: is a separate database, so keep
            // exactly one alive for the lifetime of the pool.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;

        let ledger = Self { pool };
        ledger.initialize_schema().await?;
        ledger.seed(seed).await?;

        Ok(ledger)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS appointments (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                vehicle_id TEXT NOT NULL,
                vehicle_name TEXT NOT NULL,
                service_type TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                status TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn seed(&self, appointments: &[Appointment]) -> anyhow::Result<()> {
        for appointment in appointments {
            self.insert(appointment, true).await?;
        }
        Ok(())
    }

    async fn insert(&self, appointment: &Appointment, ignore_existing: bool) -> anyhow::Result<()> {
        let sql = if ignore_existing {
            r#"
            INSERT OR IGNORE INTO appointments
                (id, vehicle_id, vehicle_name, service_type, date, time, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        } else {
            r#"
            INSERT INTO appointments
                (id, vehicle_id, vehicle_name, service_type, date, time, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        };

        sqlx::query(sql)
            .bind(&appointment.id)
            .bind(&appointment.vehicle_id)
            .bind(&appointment.vehicle_name)
            .bind(&appointment.service_type)
            .bind(&appointment.date)
            .bind(&appointment.time)
            .bind(appointment.status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl AppointmentLedger for SqliteLedger {
    async fn list(&self) -> anyhow::Result<Vec<Appointment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, vehicle_id, vehicle_name, service_type, date, time, status
            FROM appointments
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<Appointment> {
                let status: String = row.get("status");
                Ok(Appointment {
                    id: row.get("id"),
                    vehicle_id: row.get("vehicle_id"),
                    vehicle_name: row.get("vehicle_name"),
                    service_type: row.get("service_type"),
                    date: row.get("date"),
                    time: row.get("time"),
                    status: AppointmentStatus::parse(&status)?,
                })
            })
            .collect()
    }

    async fn append(&self, appointment: &Appointment) -> anyhow::Result<()> {
        self.insert(appointment, false).await
    }
}

/// The appointment ledger handed to handlers.
#[derive(Clone)]
pub struct Ledger {
    backend: Arc<dyn AppointmentLedger>,
}

impl Ledger {
    pub fn new(backend: Arc<dyn AppointmentLedger>) -> Self {
        Self { backend }
    }

    /// In-memory ledger holding the demo bookings.
    pub fn seeded() -> Self {
        Self::new(Arc::new(MemoryLedger::new(seed_appointments())))
    }

    /// Ledger for `database_url`, or in memory when none is configured.
    pub async fn open(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => {
                let backend = SqliteLedger::new(url, &seed_appointments()).await?;
                info!("Appointment ledger backed by SQLite");
                Ok(Self::new(Arc::new(backend)))
            }
            None => {
                info!("Appointment ledger held in memory");
                Ok(Self::seeded())
            }
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Appointment>> {
        Ok(self.backend.list().await?)
    }

    /// Book an appointment.
    ///
    /// Rejects the request before touching storage when a required field is
    /// blank. Otherwise assigns a fresh id, forces `confirmed`, appends and
    /// returns the stored record. Double-booking is allowed.
    pub async fn create(&self, request: BookingRequest) -> AppResult<Appointment> {
        request.validate()?;

        let appointment = Appointment {
            id: format!("APT-{}", Uuid::new_v4().simple()),
            vehicle_id: request.vehicle_id,
            vehicle_name: request.vehicle_name,
            service_type: request.service_type,
            date: request.date,
            time: request.time,
            status: AppointmentStatus::Confirmed,
        };

        self.backend.append(&appointment).await?;
        Ok(appointment)
    }
}

/// Bookings every new ledger starts with.
pub fn seed_appointments() -> Vec<Appointment> {
    vec![
        Appointment {
            id: "APT001".to_string(),
            vehicle_id: "V001".to_string(),
            vehicle_name: "Hero Xtreme".to_string(),
            service_type: "Regular Maintenance".to_string(),
            date: "2025-12-15".to_string(),
            time: "10:00".to_string(),
            status: AppointmentStatus::Confirmed,
        },
        Appointment {
            id: "APT002".to_string(),
            vehicle_id: "V003".to_string(),
            vehicle_name: "Maruti Swift".to_string(),
            service_type: "Engine Repair".to_string(),
            date: "2025-12-12".to_string(),
            time: "14:30".to_string(),
            status: AppointmentStatus::Pending,
        },
    ]
}
