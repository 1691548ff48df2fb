use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::domain::{
    Driver, DriverId, Incident, IncidentId, Trip, TripId, TripStatus, Vehicle, VehicleId,
};

/// Vehicle records addressable by id.
pub trait VehicleDirectory: Send + Sync {
    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError>;
    fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), RepositoryError>;
    fn fetch_vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, RepositoryError>;
}

/// Driver records addressable by id.
pub trait DriverDirectory: Send + Sync {
    fn insert_driver(&self, driver: Driver) -> Result<Driver, RepositoryError>;
    fn save_driver(&self, driver: Driver) -> Result<(), RepositoryError>;
    fn fetch_driver(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError>;
}

pub trait TripRepository: Send + Sync {
    fn insert_trip(&self, trip: Trip) -> Result<Trip, RepositoryError>;
    fn save_trip(&self, trip: Trip) -> Result<(), RepositoryError>;
    fn fetch_trip(&self, id: &TripId) -> Result<Option<Trip>, RepositoryError>;
    fn list_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>, RepositoryError>;
}

/// Append-mostly incident history.
pub trait IncidentLedger: Send + Sync {
    fn append_incident(&self, incident: Incident) -> Result<Incident, RepositoryError>;
    fn save_incident(&self, incident: Incident) -> Result<(), RepositoryError>;
    fn fetch_incident(&self, id: &IncidentId) -> Result<Option<Incident>, RepositoryError>;
    /// Incidents for one driver, oldest first.
    fn incidents_for_driver(&self, driver: &DriverId) -> Result<Vec<Incident>, RepositoryError>;
}

/// Every collaborator the dispatch service reads and writes through.
pub trait FleetStore: VehicleDirectory + DriverDirectory + TripRepository + IncidentLedger {}

impl<T> FleetStore for T where T: VehicleDirectory + DriverDirectory + TripRepository + IncidentLedger
{}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Source of "now" for scoring windows and license checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to; used by demos and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
