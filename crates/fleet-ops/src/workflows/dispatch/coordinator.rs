//! Exclusive sections and multi-record commits for trip transitions.
//!
//! A transition touches a trip, its vehicle, and its driver. Callers take the sections for
//! all three before re-reading and validating, then hand the resulting plan to
//! [`ConsistencyCoordinator::commit`], which writes the records in order and restores the
//! earlier ones if a later write fails. Incident filings and resolutions go through
//! [`ConsistencyCoordinator::commit_ledger`] so the stored score never drifts from the ledger.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{error, warn};

use super::domain::{Driver, DriverId, Incident, Trip, TripId, Vehicle, VehicleId};
use super::error::FleetError;
use super::lifecycle::TransitionPlan;
use super::repository::FleetStore;

/// Resource guarded by an exclusive section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKey {
    Trip(TripId),
    Vehicle(VehicleId),
    Driver(DriverId),
}

/// Table of held sections. Keys for one transition are acquired all at once, so two
/// transitions can never each hold part of what the other needs.
#[derive(Debug, Default)]
pub struct ExclusiveSections {
    held: Mutex<HashSet<SectionKey>>,
    released: Condvar,
}

impl ExclusiveSections {
    fn table(&self) -> MutexGuard<'_, HashSet<SectionKey>> {
        self.held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Blocks until every key is free or `wait` elapses.
    pub fn acquire(
        &self,
        keys: Vec<SectionKey>,
        wait: Duration,
    ) -> Result<SectionGuard<'_>, FleetError> {
        let deadline = Instant::now() + wait;
        let mut held = self.table();

        loop {
            if keys.iter().all(|key| !held.contains(key)) {
                held.extend(keys.iter().cloned());
                return Ok(SectionGuard {
                    sections: self,
                    keys,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FleetError::ConcurrentAssignmentConflict);
            }

            held = self
                .released
                .wait_timeout(held, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }

    pub fn is_held(&self, key: &SectionKey) -> bool {
        self.table().contains(key)
    }
}

/// Releases its keys when dropped.
#[derive(Debug)]
pub struct SectionGuard<'a> {
    sections: &'a ExclusiveSections,
    keys: Vec<SectionKey>,
}

impl Drop for SectionGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.sections.table();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.sections.released.notify_all();
    }
}

/// Pre-transition state used to roll back a partially written plan.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub trip: Trip,
    pub vehicle: Vehicle,
    pub driver: Driver,
}

/// Incident write paired with a driver rescore.
#[derive(Debug, Clone)]
pub enum LedgerWrite {
    Append(Incident),
    Update(Incident),
}

pub struct ConsistencyCoordinator<S> {
    store: Arc<S>,
    sections: ExclusiveSections,
    section_wait: Duration,
}

impl<S> ConsistencyCoordinator<S>
where
    S: FleetStore + 'static,
{
    pub fn new(store: Arc<S>, section_wait: Duration) -> Self {
        Self {
            store,
            sections: ExclusiveSections::default(),
            section_wait,
        }
    }

    pub fn sections(&self) -> &ExclusiveSections {
        &self.sections
    }

    pub fn enter(&self, keys: Vec<SectionKey>) -> Result<SectionGuard<'_>, FleetError> {
        self.sections.acquire(keys, self.section_wait)
    }

    /// Writes trip, vehicle, then driver. A failed write restores whatever was already
    /// written from `before` and surfaces the original failure.
    pub fn commit(&self, plan: &TransitionPlan, before: &Snapshot) -> Result<(), FleetError> {
        self.store.save_trip(plan.trip.clone())?;

        if let Some(vehicle) = &plan.vehicle {
            if let Err(err) = self.store.save_vehicle(vehicle.clone()) {
                self.compensate(before, false);
                return Err(err.into());
            }
        }

        if let Some(driver) = &plan.driver {
            if let Err(err) = self.store.save_driver(driver.clone()) {
                self.compensate(before, plan.vehicle.is_some());
                return Err(err.into());
            }
        }

        Ok(())
    }

    /// Writes the rescored driver, then the incident. A failed incident write restores
    /// `before` so the score keeps matching the ledger.
    pub fn commit_ledger(
        &self,
        rescored: &Driver,
        before: &Driver,
        write: LedgerWrite,
    ) -> Result<Incident, FleetError> {
        self.store.save_driver(rescored.clone())?;

        let outcome = match write {
            LedgerWrite::Append(incident) => self.store.append_incident(incident),
            LedgerWrite::Update(incident) => self
                .store
                .save_incident(incident.clone())
                .map(|()| incident),
        };

        outcome.map_err(|err| {
            warn!(driver_id = %before.id, "rolling back driver rescore");
            if let Err(restore) = self.store.save_driver(before.clone()) {
                error!(driver_id = %before.id, error = %restore, "failed to restore driver");
            }
            err.into()
        })
    }

    fn compensate(&self, before: &Snapshot, vehicle_written: bool) {
        warn!(trip_id = %before.trip.id, "rolling back partially applied transition");

        if let Err(err) = self.store.save_trip(before.trip.clone()) {
            error!(trip_id = %before.trip.id, error = %err, "failed to restore trip");
        }

        if vehicle_written {
            if let Err(err) = self.store.save_vehicle(before.vehicle.clone()) {
                error!(vehicle_id = %before.vehicle.id, error = %err, "failed to restore vehicle");
            }
        }
    }
}
