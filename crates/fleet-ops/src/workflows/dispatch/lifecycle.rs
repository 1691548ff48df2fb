//! Trip state machine.
//!
//! Transitions are planned as pure functions over snapshots of the trip and its bound
//! vehicle and driver. A [`TransitionPlan`] carries every record the transition rewrites so
//! the coordinator can apply them as one unit.
//!
//! ```text
//! Draft --dispatch--> Dispatched --complete--> Completed
//!   |                     |
//!   +------cancel---------+------cancel------> Cancelled
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Driver, DutyStatus, Trip, TripEvent, TripStatus, Vehicle, VehicleStatus};

/// Rejected state-machine transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {event} a trip that is {from}")]
    InvalidTransition { from: TripStatus, event: TripEvent },
    #[error("trip is {status} and accepts no further transitions (attempted {event})")]
    TerminalStateViolation { status: TripStatus, event: TripEvent },
    #[error("end odometer {end_km} km is below start odometer {start_km} km")]
    InvalidOdometerReading { start_km: u64, end_km: u64 },
}

impl TransitionError {
    pub const fn code(&self) -> &'static str {
        match self {
            TransitionError::InvalidTransition { .. } => "invalid_transition",
            TransitionError::TerminalStateViolation { .. } => "terminal_state_violation",
            TransitionError::InvalidOdometerReading { .. } => "invalid_odometer_reading",
        }
    }
}

/// Records a transition rewrites. `None` means the record is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    pub trip: Trip,
    pub vehicle: Option<Vehicle>,
    pub driver: Option<Driver>,
}

/// Verifies `event` is accepted from the trip's current status.
pub fn ensure_accepts(trip: &Trip, event: TripEvent) -> Result<(), TransitionError> {
    if trip.status.is_terminal() {
        return Err(TransitionError::TerminalStateViolation {
            status: trip.status,
            event,
        });
    }

    let accepted = match event {
        TripEvent::Dispatch => trip.status == TripStatus::Draft,
        TripEvent::Complete => trip.status == TripStatus::Dispatched,
        // both non-terminal states can be cancelled
        TripEvent::Cancel => true,
    };

    if accepted {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition {
            from: trip.status,
            event,
        })
    }
}

pub fn plan_dispatch(
    trip: &Trip,
    vehicle: &Vehicle,
    driver: &Driver,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    ensure_accepts(trip, TripEvent::Dispatch)?;

    let mut trip = trip.clone();
    trip.status = TripStatus::Dispatched;
    trip.updated_at = now;

    let mut vehicle = vehicle.clone();
    vehicle.status = VehicleStatus::OnTrip;
    vehicle.updated_at = now;

    let mut driver = driver.clone();
    driver.status = DutyStatus::OnDuty;
    driver.assigned_vehicle = Some(vehicle.id.clone());

    Ok(TransitionPlan {
        trip,
        vehicle: Some(vehicle),
        driver: Some(driver),
    })
}

pub fn plan_complete(
    trip: &Trip,
    vehicle: &Vehicle,
    driver: &Driver,
    end_odometer_km: u64,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    ensure_accepts(trip, TripEvent::Complete)?;

    if end_odometer_km < trip.start_odometer_km {
        return Err(TransitionError::InvalidOdometerReading {
            start_km: trip.start_odometer_km,
            end_km: end_odometer_km,
        });
    }

    let mut trip = trip.clone();
    trip.status = TripStatus::Completed;
    trip.end_odometer_km = Some(end_odometer_km);
    trip.updated_at = now;

    let mut vehicle = vehicle.clone();
    vehicle.status = VehicleStatus::Available;
    vehicle.odometer_km = end_odometer_km;
    vehicle.updated_at = now;

    Ok(TransitionPlan {
        trip,
        vehicle: Some(vehicle),
        driver: Some(release_driver(driver)),
    })
}

/// A cancelled draft never held its vehicle or driver, so only the trip changes.
pub fn plan_cancel(
    trip: &Trip,
    vehicle: &Vehicle,
    driver: &Driver,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    ensure_accepts(trip, TripEvent::Cancel)?;

    let was_dispatched = trip.status == TripStatus::Dispatched;

    let mut trip = trip.clone();
    trip.status = TripStatus::Cancelled;
    trip.updated_at = now;

    if !was_dispatched {
        return Ok(TransitionPlan {
            trip,
            vehicle: None,
            driver: None,
        });
    }

    let mut vehicle = vehicle.clone();
    vehicle.status = VehicleStatus::Available;
    vehicle.updated_at = now;

    Ok(TransitionPlan {
        trip,
        vehicle: Some(vehicle),
        driver: Some(release_driver(driver)),
    })
}

fn release_driver(driver: &Driver) -> Driver {
    let mut driver = driver.clone();
    driver.status = DutyStatus::OffDuty;
    driver.assigned_vehicle = None;
    driver
}
