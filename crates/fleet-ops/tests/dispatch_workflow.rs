//! End-to-end dispatch scenarios driven through the public service facade, including
//! concurrent dispatch attempts that contend for the same vehicle, driver, or trip.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use fleet_ops::config::DispatchConfig;
    use fleet_ops::workflows::dispatch::{
        DriverDirectory, DriverId, DriverOnboarding, DutyStatus, FleetDispatchService,
        InMemoryFleetStore, ManualClock, SafetyPolicy, TripRepository, TripRequest, TripStatus,
        VehicleDirectory, VehicleId, VehicleRegistration, VehicleStatus,
    };

    pub(super) type Service = FleetDispatchService<InMemoryFleetStore, ManualClock>;

    pub(super) fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 6, 30, 0).unwrap()
    }

    pub(super) fn fleet(
        vehicles: usize,
        drivers: usize,
    ) -> (Arc<Service>, Arc<InMemoryFleetStore>) {
        let store = Arc::new(InMemoryFleetStore::default());
        let service = FleetDispatchService::new(
            store.clone(),
            Arc::new(ManualClock::new(start())),
            DispatchConfig::default(),
            SafetyPolicy::default(),
        );

        for n in 0..vehicles {
            service
                .register_vehicle(VehicleRegistration {
                    id: vehicle(n),
                    name: format!("Box truck {n}"),
                    max_capacity_kg: 2000,
                    odometer_km: 50_000,
                })
                .expect("register vehicle");
        }
        for n in 0..drivers {
            service
                .onboard_driver(DriverOnboarding {
                    id: driver(n),
                    name: format!("Driver {n}"),
                    license_expires_on: NaiveDate::from_ymd_opt(2028, 1, 31).expect("valid date"),
                    onboarded_at: None,
                })
                .expect("onboard driver");
        }

        (Arc::new(service), store)
    }

    pub(super) fn vehicle(n: usize) -> VehicleId {
        VehicleId(format!("truck-{n}"))
    }

    pub(super) fn driver(n: usize) -> DriverId {
        DriverId(format!("drv-{n}"))
    }

    pub(super) fn request(vehicle_n: usize, driver_n: usize) -> TripRequest {
        TripRequest {
            vehicle_id: vehicle(vehicle_n),
            driver_id: driver(driver_n),
            cargo_weight_kg: 1200,
            start_odometer_km: 50_000,
            revenue_cents: None,
        }
    }

    /// Every OnTrip vehicle and OnDuty driver is bound to exactly one dispatched trip,
    /// and every dispatched trip holds its vehicle and driver.
    pub(super) fn assert_resource_invariants(
        store: &InMemoryFleetStore,
        vehicles: usize,
        drivers: usize,
    ) {
        let dispatched = store
            .list_trips(Some(TripStatus::Dispatched))
            .expect("list trips");

        for n in 0..vehicles {
            let vehicle = store.fetch_vehicle(&vehicle(n)).unwrap().expect("vehicle");
            let bound = dispatched
                .iter()
                .filter(|trip| trip.vehicle_id == vehicle.id)
                .count();
            match vehicle.status {
                VehicleStatus::OnTrip => assert_eq!(bound, 1, "{} bound {bound} times", vehicle.id),
                _ => assert_eq!(bound, 0, "{} idle but bound", vehicle.id),
            }
        }

        for n in 0..drivers {
            let driver = store.fetch_driver(&driver(n)).unwrap().expect("driver");
            let bound: Vec<_> = dispatched
                .iter()
                .filter(|trip| trip.driver_id == driver.id)
                .collect();
            match driver.status {
                DutyStatus::OnDuty => {
                    assert_eq!(bound.len(), 1, "{} bound {} times", driver.id, bound.len());
                    assert_eq!(driver.assigned_vehicle.as_ref(), Some(&bound[0].vehicle_id));
                }
                _ => {
                    assert!(bound.is_empty(), "{} off duty but bound", driver.id);
                    assert!(driver.assigned_vehicle.is_none());
                }
            }
        }
    }
}

use std::thread;

use common::*;
use fleet_ops::workflows::dispatch::{FleetError, Ineligibility, TransitionError, TripStatus};

#[test]
fn two_dispatchers_racing_for_one_vehicle_yield_one_winner() {
    let (service, store) = fleet(1, 2);
    let first = service.create_trip(request(0, 0)).expect("first draft");
    let second = service.create_trip(request(0, 1)).expect("second draft");

    let outcomes = thread::scope(|scope| {
        let a = scope.spawn(|| service.dispatch_trip(&first.id));
        let b = scope.spawn(|| service.dispatch_trip(&second.id));
        [a.join().expect("thread a"), b.join().expect("thread b")]
    });

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1, "outcomes: {outcomes:?}");

    let loser = outcomes
        .into_iter()
        .find_map(Result::err)
        .expect("one dispatch loses");
    assert!(
        matches!(
            loser,
            FleetError::Ineligible(Ineligibility::VehicleUnavailable { .. })
                | FleetError::ConcurrentAssignmentConflict
        ),
        "unexpected loser error: {loser:?}"
    );

    assert_resource_invariants(&store, 1, 2);
}

#[test]
fn one_trip_dispatched_twice_concurrently_transitions_once() {
    let (service, store) = fleet(1, 1);
    let trip = service.create_trip(request(0, 0)).expect("draft");

    let outcomes = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(|| service.dispatch_trip(&trip.id)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("dispatcher thread"))
            .collect::<Vec<_>>()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(FleetError::Transition(TransitionError::InvalidTransition { .. }))
            | Err(FleetError::ConcurrentAssignmentConflict)
    )));
    assert_resource_invariants(&store, 1, 1);
}

#[test]
fn contended_fleet_keeps_every_binding_exclusive() {
    const VEHICLES: usize = 3;
    const DRIVERS: usize = 4;
    let (service, store) = fleet(VEHICLES, DRIVERS);

    let mut drafts = Vec::new();
    for vehicle_n in 0..VEHICLES {
        for driver_n in 0..DRIVERS {
            drafts.push(service.create_trip(request(vehicle_n, driver_n)).expect("draft"));
        }
    }

    thread::scope(|scope| {
        for trip in &drafts {
            let service = &service;
            scope.spawn(move || {
                if service.dispatch_trip(&trip.id).is_ok() {
                    let _ = service.complete_trip(&trip.id, 50_120);
                }
            });
        }
    });

    assert_resource_invariants(&store, VEHICLES, DRIVERS);
}

#[test]
fn completed_trips_stay_completed() {
    let (service, store) = fleet(1, 1);
    let trip = service.create_trip(request(0, 0)).expect("draft");
    service.dispatch_trip(&trip.id).expect("dispatch");
    service.complete_trip(&trip.id, 50_400).expect("complete");

    for attempt in [
        service.dispatch_trip(&trip.id),
        service.complete_trip(&trip.id, 50_500),
        service.cancel_trip(&trip.id),
    ] {
        assert!(matches!(
            attempt,
            Err(FleetError::Transition(
                TransitionError::TerminalStateViolation { .. }
            ))
        ));
    }

    assert_eq!(
        service.get_trip(&trip.id).unwrap().status,
        TripStatus::Completed
    );
    assert_eq!(
        service.get_vehicle(&vehicle(0)).unwrap().odometer_km,
        50_400
    );
    assert_resource_invariants(&store, 1, 1);
}

#[test]
fn freed_vehicle_can_be_dispatched_again() {
    let (service, store) = fleet(1, 2);
    let first = service.create_trip(request(0, 0)).expect("first");
    service.dispatch_trip(&first.id).expect("dispatch first");
    service.cancel_trip(&first.id).expect("cancel first");

    let second = service.create_trip(request(0, 1)).expect("second");
    service.dispatch_trip(&second.id).expect("vehicle reusable after cancel");

    assert_resource_invariants(&store, 1, 2);
}
