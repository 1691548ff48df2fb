use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Driver, DriverId, Incident, IncidentId, Trip, TripId, TripStatus, Vehicle, VehicleId,
};
use super::repository::{
    DriverDirectory, IncidentLedger, RepositoryError, TripRepository, VehicleDirectory,
};

/// Process-local store backing the HTTP service, the demo, and tests.
#[derive(Default, Clone)]
pub struct InMemoryFleetStore {
    vehicles: Arc<Mutex<HashMap<VehicleId, Vehicle>>>,
    drivers: Arc<Mutex<HashMap<DriverId, Driver>>>,
    trips: Arc<Mutex<HashMap<TripId, Trip>>>,
    incidents: Arc<Mutex<Vec<Incident>>>,
}

fn lock<'a, T>(
    table: &'a Mutex<T>,
    name: &'static str,
) -> Result<MutexGuard<'a, T>, RepositoryError> {
    table
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} table poisoned")))
}

impl VehicleDirectory for InMemoryFleetStore {
    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError> {
        let mut guard = lock(&self.vehicles, "vehicle")?;
        if guard.contains_key(&vehicle.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(vehicle.id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.vehicles, "vehicle")?;
        match guard.get_mut(&vehicle.id) {
            Some(slot) => {
                *slot = vehicle;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        Ok(lock(&self.vehicles, "vehicle")?.get(id).cloned())
    }
}

impl DriverDirectory for InMemoryFleetStore {
    fn insert_driver(&self, driver: Driver) -> Result<Driver, RepositoryError> {
        let mut guard = lock(&self.drivers, "driver")?;
        if guard.contains_key(&driver.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(driver.id.clone(), driver.clone());
        Ok(driver)
    }

    fn save_driver(&self, driver: Driver) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.drivers, "driver")?;
        match guard.get_mut(&driver.id) {
            Some(slot) => {
                *slot = driver;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_driver(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        Ok(lock(&self.drivers, "driver")?.get(id).cloned())
    }
}

impl TripRepository for InMemoryFleetStore {
    fn insert_trip(&self, trip: Trip) -> Result<Trip, RepositoryError> {
        let mut guard = lock(&self.trips, "trip")?;
        if guard.contains_key(&trip.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(trip.id.clone(), trip.clone());
        Ok(trip)
    }

    fn save_trip(&self, trip: Trip) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.trips, "trip")?;
        match guard.get_mut(&trip.id) {
            Some(slot) => {
                *slot = trip;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_trip(&self, id: &TripId) -> Result<Option<Trip>, RepositoryError> {
        Ok(lock(&self.trips, "trip")?.get(id).cloned())
    }

    fn list_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>, RepositoryError> {
        let guard = lock(&self.trips, "trip")?;
        let mut trips: Vec<Trip> = guard
            .values()
            .filter(|trip| status.map_or(true, |wanted| trip.status == wanted))
            .cloned()
            .collect();
        trips.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(trips)
    }
}

impl IncidentLedger for InMemoryFleetStore {
    fn append_incident(&self, incident: Incident) -> Result<Incident, RepositoryError> {
        let mut guard = lock(&self.incidents, "incident")?;
        if guard.iter().any(|existing| existing.id == incident.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(incident.clone());
        Ok(incident)
    }

    fn save_incident(&self, incident: Incident) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.incidents, "incident")?;
        match guard.iter_mut().find(|existing| existing.id == incident.id) {
            Some(slot) => {
                *slot = incident;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_incident(&self, id: &IncidentId) -> Result<Option<Incident>, RepositoryError> {
        let guard = lock(&self.incidents, "incident")?;
        Ok(guard.iter().find(|incident| &incident.id == id).cloned())
    }

    fn incidents_for_driver(&self, driver: &DriverId) -> Result<Vec<Incident>, RepositoryError> {
        let guard = lock(&self.incidents, "incident")?;
        let mut history: Vec<Incident> = guard
            .iter()
            .filter(|incident| &incident.driver_id == driver)
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.filed_at.cmp(&b.filed_at))
        });
        Ok(history)
    }
}
