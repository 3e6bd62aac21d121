//! Vehicle telemetry store with simulated sensor drift.
//!
//! Every [`Telemetry::list`] call nudges each vehicle's readings by a small
//! bounded random amount, clamps them to their valid ranges and recomputes
//! status. Brake and battery health only ever decrease, so a long-running
//! process drives every vehicle towards `critical`; the clamps keep readings
//! in range regardless of how often the fleet is polled.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use rand::Rng;

use crate::model::{Readings, Vehicle};

pub const ENGINE_TEMP_MIN: f64 = 60.0;
pub const ENGINE_TEMP_MAX: f64 = 110.0;
pub const HEALTH_MIN: f64 = 0.0;
pub const HEALTH_MAX: f64 = 100.0;
pub const VIBRATION_MIN: f64 = 0.0;

/// Maximum absolute engine temperature change per poll.
const ENGINE_TEMP_STEP: f64 = 2.0;

/// Maximum absolute vibration change per poll.
const VIBRATION_STEP: f64 = 1.5;

/// Backing storage for vehicles.
///
/// `mutate` must apply the closure to every vehicle and return the result
/// atomically with respect to other callers.
pub trait VehicleStore: Send + Sync {
    fn list(&self) -> Vec<Vehicle>;

    fn mutate(&self, f: &mut dyn FnMut(&mut Vehicle)) -> Vec<Vehicle>;
}

/// In-process vehicle store guarded by a mutex.
pub struct MemoryVehicleStore {
    vehicles: Mutex<Vec<Vehicle>>,
}

impl MemoryVehicleStore {
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self {
            vehicles: Mutex::new(vehicles),
        }
    }
}

impl VehicleStore for MemoryVehicleStore {
    fn list(&self) -> Vec<Vehicle> {
        self.vehicles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn mutate(&self, f: &mut dyn FnMut(&mut Vehicle)) -> Vec<Vehicle> {
        let mut vehicles = self.vehicles.lock().unwrap_or_else(PoisonError::into_inner);
        vehicles.iter_mut().for_each(|v| f(v));
        vehicles.clone()
    }
}

/// The telemetry component handed to handlers and pollers.
#[derive(Clone)]
pub struct Telemetry {
    store: Arc<dyn VehicleStore>,
}

impl Telemetry {
    pub fn new(store: Arc<dyn VehicleStore>) -> Self {
        Self { store }
    }

    /// Telemetry over the built-in demo fleet.
    pub fn seeded() -> Self {
        Self::new(Arc::new(MemoryVehicleStore::new(seed_vehicles())))
    }

    /// Advance every vehicle by one drift step and return the new state.
    pub fn list(&self) -> Vec<Vehicle> {
        let mut rng = rand::rng();
        self.list_with(&mut rng)
    }

    /// Same as [`list`](Self::list) with a caller-supplied random source.
    pub fn list_with<R: Rng>(&self, rng: &mut R) -> Vec<Vehicle> {
        self.store
            .mutate(&mut |vehicle: &mut Vehicle| apply_drift(vehicle, rng))
    }

    /// Current state without advancing the simulation.
    pub fn snapshot(&self) -> Vec<Vehicle> {
        self.store.list()
    }
}

/// Apply one bounded random drift step to a vehicle.
pub fn apply_drift<R: Rng>(vehicle: &mut Vehicle, rng: &mut R) {
    let engine_delta = rng.random_range(-ENGINE_TEMP_STEP..=ENGINE_TEMP_STEP);
    let brake_wear = f64::from(rng.random_range(0u8..=1));
    let battery_wear = f64::from(rng.random_range(0u8..=1));
    let vibration_delta = rng.random_range(-VIBRATION_STEP..=VIBRATION_STEP);

    vehicle.update_readings(|r| {
        r.engine_temp =
            round1((r.engine_temp + engine_delta).clamp(ENGINE_TEMP_MIN, ENGINE_TEMP_MAX));
        r.brake_health = (r.brake_health - brake_wear).clamp(HEALTH_MIN, HEALTH_MAX);
        r.battery = (r.battery - battery_wear).clamp(HEALTH_MIN, HEALTH_MAX);
        r.vibration = round1((r.vibration + vibration_delta).max(VIBRATION_MIN));
    });
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The demo fleet every process starts with.
pub fn seed_vehicles() -> Vec<Vehicle> {
    [
        ("V001", "Hero Xtreme", 85.0, 80.0, 90.0, 5.0, (2025, 12, 1)),
        ("V002", "M&M Thar", 78.0, 90.0, 95.0, 3.0, (2025, 11, 25)),
        ("V003", "Maruti Swift", 92.0, 65.0, 72.0, 12.0, (2025, 10, 15)),
        ("V004", "Hyundai Creta", 88.0, 75.0, 85.0, 8.0, (2025, 11, 10)),
    ]
    .into_iter()
    .map(
        |(id, name, engine_temp, brake_health, battery, vibration, (y, m, d))| {
            let readings = Readings {
                engine_temp,
                brake_health,
                battery,
                vibration,
            };
            let last_maintenance = NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
            Vehicle::new(id, name, readings, last_maintenance)
        },
    )
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VehicleStatus;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_in_range(vehicle: &Vehicle) {
        let r = vehicle.readings();
        assert!((ENGINE_TEMP_MIN..=ENGINE_TEMP_MAX).contains(&r.engine_temp));
        assert!((HEALTH_MIN..=HEALTH_MAX).contains(&r.brake_health));
        assert!((HEALTH_MIN..=HEALTH_MAX).contains(&r.battery));
        assert!(r.vibration >= VIBRATION_MIN);
    }

    #[test]
    fn test_seed_status_is_derived() {
        let vehicles = seed_vehicles();
        let v003 = vehicles.iter().find(|v| v.id == "V003").unwrap();

        assert_eq!(v003.readings().engine_temp, 92.0);
        assert_eq!(v003.readings().brake_health, 65.0);
        assert_eq!(v003.status(), VehicleStatus::Critical);

        let v004 = vehicles.iter().find(|v| v.id == "V004").unwrap();
        assert_eq!(v004.status(), VehicleStatus::Warning);
    }

    #[test]
    fn test_ranges_and_status_hold_over_many_polls() {
        let telemetry = Telemetry::seeded();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            for vehicle in telemetry.list_with(&mut rng) {
                assert_in_range(&vehicle);
                let r = vehicle.readings();
                assert_eq!(
                    vehicle.status(),
                    VehicleStatus::from_readings(r.engine_temp, r.brake_health)
                );
            }
        }
    }

    #[test]
    fn test_brake_and_battery_never_increase() {
        let telemetry = Telemetry::seeded();
        let mut rng = StdRng::seed_from_u64(42);
        let mut previous = telemetry.snapshot();

        for _ in 0..50 {
            let current = telemetry.list_with(&mut rng);
            for (before, after) in previous.iter().zip(&current) {
                assert!(after.readings().brake_health <= before.readings().brake_health);
                assert!(after.readings().battery <= before.readings().battery);
                assert!(before.readings().brake_health - after.readings().brake_health <= 1.0);
            }
            previous = current;
        }
    }

    #[test]
    fn test_long_run_converges_to_critical() {
        let telemetry = Telemetry::seeded();
        let mut rng = StdRng::seed_from_u64(3);

        // Brakes lose at most 1 per poll from a 90 start; run far past that.
        for _ in 0..2_000 {
            telemetry.list_with(&mut rng);
        }

        for vehicle in telemetry.snapshot() {
            assert_eq!(vehicle.readings().brake_health, HEALTH_MIN);
            assert_eq!(vehicle.status(), VehicleStatus::Critical);
        }
    }

    #[test]
    fn test_clamps_at_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let readings = Readings {
            engine_temp: ENGINE_TEMP_MAX,
            brake_health: HEALTH_MIN,
            battery: HEALTH_MIN,
            vibration: VIBRATION_MIN,
        };
        let mut vehicle = Vehicle::new("VX", "Edge", readings, date);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            apply_drift(&mut vehicle, &mut rng);
            assert_in_range(&vehicle);
        }
    }

    #[test]
    fn test_snapshot_does_not_drift() {
        let telemetry = Telemetry::seeded();
        assert_eq!(telemetry.snapshot(), telemetry.snapshot());
    }

    #[test]
    fn test_list_persists_mutation() {
        let telemetry = Telemetry::seeded();
        let mut rng = StdRng::seed_from_u64(5);
        let polled = telemetry.list_with(&mut rng);
        assert_eq!(polled, telemetry.snapshot());
    }
}
