use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::DispatchConfig;
use crate::workflows::dispatch::domain::{
    ComplianceStatus, Driver, DriverId, DriverOnboarding, DutyStatus, Incident, IncidentId,
    IncidentReport, IncidentSeverity, IncidentStatus, IncidentType, Trip, TripId, TripRequest,
    TripStatus, Vehicle, VehicleId, VehicleRegistration, VehicleStatus,
};
use crate::workflows::dispatch::repository::{
    DriverDirectory, IncidentLedger, ManualClock, RepositoryError, TripRepository,
    VehicleDirectory,
};
use crate::workflows::dispatch::{
    fleet_router, FleetDispatchService, InMemoryFleetStore, SafetyPolicy,
};

pub(super) type MemoryService = FleetDispatchService<InMemoryFleetStore, ManualClock>;

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub(super) fn today() -> NaiveDate {
    start().date_naive()
}

pub(super) fn van_id() -> VehicleId {
    VehicleId("van-1".to_string())
}

pub(super) fn driver_id() -> DriverId {
    DriverId("drv-1".to_string())
}

pub(super) fn vehicle() -> Vehicle {
    Vehicle {
        id: van_id(),
        name: "Sprinter 314".to_string(),
        max_capacity_kg: 1000,
        odometer_km: 12_000,
        status: VehicleStatus::Available,
        updated_at: start(),
    }
}

pub(super) fn driver() -> Driver {
    Driver {
        id: driver_id(),
        name: "Ada Byron".to_string(),
        status: DutyStatus::OffDuty,
        license_expires_on: NaiveDate::from_ymd_opt(2027, 12, 31).expect("valid date"),
        safety_score: 100,
        compliance_status: ComplianceStatus::Active,
        total_incidents: 0,
        last_score_updated: None,
        suspended_at: None,
        suspension_reason: None,
        assigned_vehicle: None,
        created_at: start(),
    }
}

pub(super) fn draft_trip() -> Trip {
    Trip {
        id: TripId("trip-000001".to_string()),
        vehicle_id: van_id(),
        driver_id: driver_id(),
        cargo_weight_kg: 400,
        start_odometer_km: 12_000,
        end_odometer_km: None,
        revenue_cents: Some(45_000),
        status: TripStatus::Draft,
        created_at: start(),
        updated_at: start(),
    }
}

pub(super) fn registration(id: &str, max_capacity_kg: u32) -> VehicleRegistration {
    VehicleRegistration {
        id: VehicleId(id.to_string()),
        name: format!("Vehicle {id}"),
        max_capacity_kg,
        odometer_km: 12_000,
    }
}

pub(super) fn onboarding(id: &str) -> DriverOnboarding {
    DriverOnboarding {
        id: DriverId(id.to_string()),
        name: format!("Driver {id}"),
        license_expires_on: NaiveDate::from_ymd_opt(2027, 12, 31).expect("valid date"),
        onboarded_at: Some(start()),
    }
}

pub(super) fn trip_request(cargo_weight_kg: u32) -> TripRequest {
    TripRequest {
        vehicle_id: van_id(),
        driver_id: driver_id(),
        cargo_weight_kg,
        start_odometer_km: 12_000,
        revenue_cents: Some(45_000),
    }
}

pub(super) fn incident(
    id: &str,
    kind: IncidentType,
    severity: IncidentSeverity,
    occurred_at: DateTime<Utc>,
) -> Incident {
    Incident {
        id: IncidentId(id.to_string()),
        driver_id: driver_id(),
        trip_id: None,
        kind,
        severity,
        description: format!("{kind:?} report"),
        status: IncidentStatus::Open,
        occurred_at,
        filed_by: "safety-officer".to_string(),
        filed_at: occurred_at,
        resolved_by: None,
        resolved_at: None,
    }
}

pub(super) fn report(kind: IncidentType, severity: IncidentSeverity) -> IncidentReport {
    IncidentReport {
        driver_id: driver_id(),
        trip_id: None,
        kind,
        severity,
        description: "Observed by dashcam review".to_string(),
        occurred_at: start(),
        filed_by: "safety-officer".to_string(),
    }
}

/// Short waits and no retries so conflict tests fail fast.
pub(super) fn impatient_config() -> DispatchConfig {
    DispatchConfig {
        conflict_retries: 0,
        section_wait_ms: 20,
    }
}

/// Service over an in-memory store seeded with `van-1` (1000 kg) and `drv-1`.
pub(super) fn build_service() -> (MemoryService, Arc<InMemoryFleetStore>, Arc<ManualClock>) {
    build_service_with(DispatchConfig::default())
}

pub(super) fn build_service_with(
    config: DispatchConfig,
) -> (MemoryService, Arc<InMemoryFleetStore>, Arc<ManualClock>) {
    let store = Arc::new(InMemoryFleetStore::default());
    let clock = Arc::new(ManualClock::new(start()));
    let service = FleetDispatchService::new(
        store.clone(),
        clock.clone(),
        config,
        SafetyPolicy::default(),
    );

    service
        .register_vehicle(registration("van-1", 1000))
        .expect("seed vehicle");
    service.onboard_driver(onboarding("drv-1")).expect("seed driver");

    (service, store, clock)
}

pub(super) fn fleet_router_with_service(service: MemoryService) -> axum::Router {
    fleet_router(Arc::new(service))
}

/// In-memory store whose vehicle, driver, or incident writes can be switched to fail.
#[derive(Default, Clone)]
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryFleetStore,
    fail_vehicle_saves: Arc<AtomicBool>,
    fail_driver_saves: Arc<AtomicBool>,
    fail_incident_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub(super) fn fail_vehicle_saves(&self) {
        self.fail_vehicle_saves.store(true, Ordering::SeqCst);
    }

    pub(super) fn fail_driver_saves(&self) {
        self.fail_driver_saves.store(true, Ordering::SeqCst);
    }

    pub(super) fn fail_incident_writes(&self) {
        self.fail_incident_writes.store(true, Ordering::SeqCst);
    }

    fn incident_writes_offline(&self) -> Result<(), RepositoryError> {
        if self.fail_incident_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("incident ledger offline".to_string()));
        }
        Ok(())
    }
}

impl VehicleDirectory for FlakyStore {
    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError> {
        self.inner.insert_vehicle(vehicle)
    }

    fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), RepositoryError> {
        if self.fail_vehicle_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("vehicle table offline".to_string()));
        }
        self.inner.save_vehicle(vehicle)
    }

    fn fetch_vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        self.inner.fetch_vehicle(id)
    }
}

impl DriverDirectory for FlakyStore {
    fn insert_driver(&self, driver: Driver) -> Result<Driver, RepositoryError> {
        self.inner.insert_driver(driver)
    }

    fn save_driver(&self, driver: Driver) -> Result<(), RepositoryError> {
        if self.fail_driver_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("driver table offline".to_string()));
        }
        self.inner.save_driver(driver)
    }

    fn fetch_driver(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        self.inner.fetch_driver(id)
    }
}

impl TripRepository for FlakyStore {
    fn insert_trip(&self, trip: Trip) -> Result<Trip, RepositoryError> {
        self.inner.insert_trip(trip)
    }

    fn save_trip(&self, trip: Trip) -> Result<(), RepositoryError> {
        self.inner.save_trip(trip)
    }

    fn fetch_trip(&self, id: &TripId) -> Result<Option<Trip>, RepositoryError> {
        self.inner.fetch_trip(id)
    }

    fn list_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>, RepositoryError> {
        self.inner.list_trips(status)
    }
}

impl IncidentLedger for FlakyStore {
    fn append_incident(&self, incident: Incident) -> Result<Incident, RepositoryError> {
        self.incident_writes_offline()?;
        self.inner.append_incident(incident)
    }

    fn save_incident(&self, incident: Incident) -> Result<(), RepositoryError> {
        self.incident_writes_offline()?;
        self.inner.save_incident(incident)
    }

    fn fetch_incident(&self, id: &IncidentId) -> Result<Option<Incident>, RepositoryError> {
        self.inner.fetch_incident(id)
    }

    fn incidents_for_driver(&self, driver: &DriverId) -> Result<Vec<Incident>, RepositoryError> {
        self.inner.incidents_for_driver(driver)
    }
}

/// Store that refuses every read and write.
pub(super) struct OfflineStore;

impl VehicleDirectory for OfflineStore {
    fn insert_vehicle(&self, _vehicle: Vehicle) -> Result<Vehicle, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_vehicle(&self, _vehicle: Vehicle) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_vehicle(&self, _id: &VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl DriverDirectory for OfflineStore {
    fn insert_driver(&self, _driver: Driver) -> Result<Driver, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_driver(&self, _driver: Driver) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_driver(&self, _id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl TripRepository for OfflineStore {
    fn insert_trip(&self, _trip: Trip) -> Result<Trip, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_trip(&self, _trip: Trip) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_trip(&self, _id: &TripId) -> Result<Option<Trip>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_trips(&self, _status: Option<TripStatus>) -> Result<Vec<Trip>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl IncidentLedger for OfflineStore {
    fn append_incident(&self, _incident: Incident) -> Result<Incident, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_incident(&self, _incident: Incident) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_incident(&self, _id: &IncidentId) -> Result<Option<Incident>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn incidents_for_driver(&self, _driver: &DriverId) -> Result<Vec<Incident>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
