use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::coordinator::{ConsistencyCoordinator, LedgerWrite, SectionKey, Snapshot};
use super::domain::{
    ComplianceStatus, Driver, DriverId, DriverOnboarding, Incident, IncidentId,
    IncidentResolution, IncidentReport, IncidentStatus, Trip, TripEvent, TripId, TripRequest,
    TripStatus, Vehicle, VehicleId, VehicleRegistration, VehicleStatus,
};
use super::eligibility::{check_assignment, check_driver, DriverEligibility, Ineligibility};
use super::error::FleetError;
use super::lifecycle::{self, TransitionPlan};
use super::repository::{Clock, FleetStore};
use super::safety::{apply_license_expiry_status, SafetyAssessment, SafetyPolicy, SafetyScoreEngine};
use crate::config::DispatchConfig;

/// Facade over eligibility, the trip state machine, the coordinator, and safety scoring.
pub struct FleetDispatchService<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    coordinator: ConsistencyCoordinator<S>,
    safety: SafetyScoreEngine,
    config: DispatchConfig,
}

/// Incident as recorded, with the score it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiledIncident {
    pub incident: Incident,
    pub assessment: SafetyAssessment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverSafetyProfile {
    pub driver_id: DriverId,
    pub name: String,
    pub safety_score: u8,
    pub compliance_status: ComplianceStatus,
    pub effective_compliance: ComplianceStatus,
    pub total_incidents: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_score_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
    pub incidents: Vec<Incident>,
}

impl<S, C> FleetDispatchService<S, C>
where
    S: FleetStore + 'static,
    C: Clock + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<C>, config: DispatchConfig, policy: SafetyPolicy) -> Self {
        let coordinator = ConsistencyCoordinator::new(store.clone(), config.section_wait());

        Self {
            store,
            clock,
            coordinator,
            safety: SafetyScoreEngine::new(policy),
            config,
        }
    }

    pub fn coordinator(&self) -> &ConsistencyCoordinator<S> {
        &self.coordinator
    }

    pub fn safety_policy(&self) -> &SafetyPolicy {
        self.safety.policy()
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Random ids, so several services over one store (or a persistent store) never collide.
    fn next_trip_id(&self) -> TripId {
        TripId(format!("trip-{}", Uuid::new_v4().simple()))
    }

    fn next_incident_id(&self) -> IncidentId {
        IncidentId(format!("inc-{}", Uuid::new_v4().simple()))
    }

    fn load_vehicle(&self, id: &VehicleId) -> Result<Vehicle, FleetError> {
        self.store
            .fetch_vehicle(id)?
            .ok_or_else(|| FleetError::not_found("vehicle", id))
    }

    fn load_driver(&self, id: &DriverId) -> Result<Driver, FleetError> {
        self.store
            .fetch_driver(id)?
            .ok_or_else(|| FleetError::not_found("driver", id))
    }

    fn load_trip(&self, id: &TripId) -> Result<Trip, FleetError> {
        self.store
            .fetch_trip(id)?
            .ok_or_else(|| FleetError::not_found("trip", id))
    }

    fn load_incident(&self, id: &IncidentId) -> Result<Incident, FleetError> {
        self.store
            .fetch_incident(id)?
            .ok_or_else(|| FleetError::not_found("incident", id))
    }

    /// Re-runs `attempt` when it lost an exclusive-section race, up to the configured limit.
    fn with_conflict_retry<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, FleetError>,
    ) -> Result<T, FleetError> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(FleetError::ConcurrentAssignmentConflict)
                    if retries < self.config.conflict_retries =>
                {
                    retries += 1;
                    warn!(operation, retries, "exclusive section busy, retrying");
                }
                outcome => return outcome,
            }
        }
    }

    pub fn register_vehicle(&self, registration: VehicleRegistration) -> Result<Vehicle, FleetError> {
        if registration.id.0.trim().is_empty() {
            return Err(FleetError::InvalidRequest("vehicle id is required".to_string()));
        }
        if registration.max_capacity_kg == 0 {
            return Err(FleetError::InvalidRequest(
                "vehicle capacity must be positive".to_string(),
            ));
        }

        let vehicle = self
            .store
            .insert_vehicle(registration.into_vehicle(self.clock.now()))?;
        info!(vehicle_id = %vehicle.id, capacity_kg = vehicle.max_capacity_kg, "vehicle registered");
        Ok(vehicle)
    }

    pub fn onboard_driver(&self, onboarding: DriverOnboarding) -> Result<Driver, FleetError> {
        if onboarding.id.0.trim().is_empty() {
            return Err(FleetError::InvalidRequest("driver id is required".to_string()));
        }

        let driver = self
            .store
            .insert_driver(onboarding.into_driver(self.clock.now()))?;
        info!(driver_id = %driver.id, license_expires_on = %driver.license_expires_on, "driver onboarded");
        Ok(driver)
    }

    /// Records a Draft trip after checking the pair is assignable. Nothing is bound until
    /// [`Self::dispatch_trip`].
    pub fn create_trip(&self, request: TripRequest) -> Result<Trip, FleetError> {
        self.load_vehicle(&request.vehicle_id)?;
        self.load_driver(&request.driver_id)?;

        self.with_conflict_retry("create_trip", || {
            let _section = self.coordinator.enter(vec![
                SectionKey::Vehicle(request.vehicle_id.clone()),
                SectionKey::Driver(request.driver_id.clone()),
            ])?;

            let vehicle = self.load_vehicle(&request.vehicle_id)?;
            let driver = self.load_driver(&request.driver_id)?;
            let now = self.clock.now();

            if let Err(reason) =
                check_assignment(&vehicle, &driver, request.cargo_weight_kg, now.date_naive())
            {
                warn!(vehicle_id = %vehicle.id, driver_id = %driver.id, code = reason.code(), "trip creation rejected");
                return Err(reason.into());
            }

            let trip = self.store.insert_trip(Trip {
                id: self.next_trip_id(),
                vehicle_id: request.vehicle_id.clone(),
                driver_id: request.driver_id.clone(),
                cargo_weight_kg: request.cargo_weight_kg,
                start_odometer_km: request.start_odometer_km,
                end_odometer_km: None,
                revenue_cents: request.revenue_cents,
                status: TripStatus::Draft,
                created_at: now,
                updated_at: now,
            })?;

            info!(trip_id = %trip.id, vehicle_id = %trip.vehicle_id, driver_id = %trip.driver_id, "trip drafted");
            Ok(trip)
        })
    }

    pub fn dispatch_trip(&self, trip_id: &TripId) -> Result<Trip, FleetError> {
        self.transition(trip_id, TripEvent::Dispatch, |trip, vehicle, driver, now| {
            lifecycle::ensure_accepts(trip, TripEvent::Dispatch)?;
            check_assignment(vehicle, driver, trip.cargo_weight_kg, now.date_naive())?;
            Ok(lifecycle::plan_dispatch(trip, vehicle, driver, now)?)
        })
    }

    pub fn complete_trip(&self, trip_id: &TripId, end_odometer_km: u64) -> Result<Trip, FleetError> {
        self.transition(trip_id, TripEvent::Complete, |trip, vehicle, driver, now| {
            Ok(lifecycle::plan_complete(
                trip,
                vehicle,
                driver,
                end_odometer_km,
                now,
            )?)
        })
    }

    pub fn cancel_trip(&self, trip_id: &TripId) -> Result<Trip, FleetError> {
        self.transition(trip_id, TripEvent::Cancel, |trip, vehicle, driver, now| {
            Ok(lifecycle::plan_cancel(trip, vehicle, driver, now)?)
        })
    }

    /// Runs one guarded read-validate-write sequence for a trip and its bound resources.
    fn transition<F>(&self, trip_id: &TripId, event: TripEvent, plan: F) -> Result<Trip, FleetError>
    where
        F: Fn(&Trip, &Vehicle, &Driver, DateTime<Utc>) -> Result<TransitionPlan, FleetError>,
    {
        // vehicle and driver references never change after creation
        let bound = self.load_trip(trip_id)?;

        self.with_conflict_retry(event.label(), || {
            let _section = self.coordinator.enter(vec![
                SectionKey::Trip(trip_id.clone()),
                SectionKey::Vehicle(bound.vehicle_id.clone()),
                SectionKey::Driver(bound.driver_id.clone()),
            ])?;

            let trip = self.load_trip(trip_id)?;
            let vehicle = self.load_vehicle(&trip.vehicle_id)?;
            let driver = self.load_driver(&trip.driver_id)?;
            let now = self.clock.now();

            let planned = match plan(&trip, &vehicle, &driver, now) {
                Ok(planned) => planned,
                Err(err) => {
                    warn!(trip_id = %trip.id, event = event.label(), code = err.code(), "trip transition rejected");
                    return Err(err);
                }
            };

            let before = Snapshot {
                trip: trip.clone(),
                vehicle,
                driver,
            };
            self.coordinator.commit(&planned, &before)?;

            info!(
                trip_id = %planned.trip.id,
                vehicle_id = %planned.trip.vehicle_id,
                driver_id = %planned.trip.driver_id,
                from = trip.status.label(),
                to = planned.trip.status.label(),
                "trip transition committed"
            );
            Ok(planned.trip)
        })
    }

    /// Appends an incident to the driver's ledger and synchronously recomputes their score.
    pub fn file_incident(&self, report: IncidentReport) -> Result<FiledIncident, FleetError> {
        if report.description.trim().is_empty() {
            return Err(FleetError::InvalidRequest(
                "incident description is required".to_string(),
            ));
        }
        if report.filed_by.trim().is_empty() {
            return Err(FleetError::InvalidRequest(
                "incident filer is required".to_string(),
            ));
        }

        self.load_driver(&report.driver_id)?;
        if let Some(trip_id) = &report.trip_id {
            let trip = self.load_trip(trip_id)?;
            if trip.driver_id != report.driver_id {
                return Err(FleetError::InvalidRequest(format!(
                    "trip {} was not driven by {}",
                    trip.id, report.driver_id
                )));
            }
        }

        self.with_conflict_retry("file_incident", || {
            let _section = self
                .coordinator
                .enter(vec![SectionKey::Driver(report.driver_id.clone())])?;
            let now = self.clock.now();

            let incident = Incident {
                id: self.next_incident_id(),
                driver_id: report.driver_id.clone(),
                trip_id: report.trip_id.clone(),
                kind: report.kind,
                severity: report.severity,
                description: report.description.trim().to_string(),
                status: IncidentStatus::Open,
                occurred_at: report.occurred_at,
                filed_by: report.filed_by.clone(),
                filed_at: now,
                resolved_by: None,
                resolved_at: None,
            };

            let mut history = self.store.incidents_for_driver(&report.driver_id)?;
            history.push(incident.clone());
            history.sort_by(|a, b| {
                a.occurred_at
                    .cmp(&b.occurred_at)
                    .then_with(|| a.filed_at.cmp(&b.filed_at))
            });

            let (before, rescored, assessment) = self.rescore(&report.driver_id, &history, now)?;
            let incident =
                self.coordinator
                    .commit_ledger(&rescored, &before, LedgerWrite::Append(incident))?;

            info!(incident_id = %incident.id, driver_id = %incident.driver_id, severity = ?incident.severity, "incident filed");
            log_assessment(&before, &assessment);

            Ok(FiledIncident {
                incident,
                assessment,
            })
        })
    }

    /// Marks an incident resolved. Resolved incidents remain part of the scored ledger.
    pub fn resolve_incident(
        &self,
        incident_id: &IncidentId,
        resolution: IncidentResolution,
    ) -> Result<Incident, FleetError> {
        if resolution.resolved_by.trim().is_empty() {
            return Err(FleetError::InvalidRequest(
                "resolver is required".to_string(),
            ));
        }

        let driver_id = self.load_incident(incident_id)?.driver_id;

        self.with_conflict_retry("resolve_incident", || {
            let _section = self
                .coordinator
                .enter(vec![SectionKey::Driver(driver_id.clone())])?;

            let mut incident = self.load_incident(incident_id)?;
            if incident.status == IncidentStatus::Resolved {
                return Err(FleetError::InvalidRequest(format!(
                    "incident {} is already resolved",
                    incident.id
                )));
            }

            let now = self.clock.now();
            incident.status = IncidentStatus::Resolved;
            incident.resolved_by = Some(resolution.resolved_by.clone());
            incident.resolved_at = Some(now);

            let history: Vec<Incident> = self
                .store
                .incidents_for_driver(&driver_id)?
                .into_iter()
                .map(|existing| {
                    if existing.id == incident.id {
                        incident.clone()
                    } else {
                        existing
                    }
                })
                .collect();

            let (before, rescored, assessment) = self.rescore(&driver_id, &history, now)?;
            let incident =
                self.coordinator
                    .commit_ledger(&rescored, &before, LedgerWrite::Update(incident))?;

            info!(incident_id = %incident.id, driver_id = %driver_id, "incident resolved");
            log_assessment(&before, &assessment);
            Ok(incident)
        })
    }

    /// Rebuilds the driver's safety score from their full incident history.
    pub fn recompute_safety(&self, driver_id: &DriverId) -> Result<SafetyAssessment, FleetError> {
        self.load_driver(driver_id)?;

        self.with_conflict_retry("recompute_safety", || {
            let _section = self
                .coordinator
                .enter(vec![SectionKey::Driver(driver_id.clone())])?;
            self.recompute_locked(driver_id, self.clock.now())
        })
    }

    /// Caller must hold the driver's section.
    fn recompute_locked(
        &self,
        driver_id: &DriverId,
        now: DateTime<Utc>,
    ) -> Result<SafetyAssessment, FleetError> {
        let history = self.store.incidents_for_driver(driver_id)?;
        let (before, rescored, assessment) = self.rescore(driver_id, &history, now)?;
        self.store.save_driver(rescored)?;

        log_assessment(&before, &assessment);
        Ok(assessment)
    }

    /// Scores `history` against the stored driver without writing anything. Returns the
    /// driver as stored, the rescored driver, and the assessment.
    fn rescore(
        &self,
        driver_id: &DriverId,
        history: &[Incident],
        now: DateTime<Utc>,
    ) -> Result<(Driver, Driver, SafetyAssessment), FleetError> {
        let before = self.load_driver(driver_id)?;
        let mut rescored = before.clone();
        let assessment = self.safety.recompute(&mut rescored, history, now);
        Ok((before, rescored, assessment))
    }

    pub fn driver_eligibility(&self, driver_id: &DriverId) -> Result<DriverEligibility, FleetError> {
        let driver = self.load_driver(driver_id)?;
        let today = self.today();
        let reason = check_driver(&driver, today).err();

        Ok(DriverEligibility {
            driver_id: driver.id.clone(),
            eligible: reason.is_none(),
            reason,
            compliance_status: driver.compliance_status,
            effective_compliance: apply_license_expiry_status(&driver, today, self.safety.policy()),
        })
    }

    pub fn driver_safety_profile(
        &self,
        driver_id: &DriverId,
    ) -> Result<DriverSafetyProfile, FleetError> {
        let driver = self.load_driver(driver_id)?;
        let incidents = self.store.incidents_for_driver(driver_id)?;
        let effective_compliance =
            apply_license_expiry_status(&driver, self.today(), self.safety.policy());

        Ok(DriverSafetyProfile {
            driver_id: driver.id,
            name: driver.name,
            safety_score: driver.safety_score,
            compliance_status: driver.compliance_status,
            effective_compliance,
            total_incidents: driver.total_incidents,
            last_score_updated: driver.last_score_updated,
            suspended_at: driver.suspended_at,
            suspension_reason: driver.suspension_reason,
            incidents,
        })
    }

    pub fn send_to_shop(&self, vehicle_id: &VehicleId) -> Result<Vehicle, FleetError> {
        self.maintain(
            vehicle_id,
            "send_to_shop",
            &[VehicleStatus::Available],
            VehicleStatus::InShop,
        )
    }

    pub fn release_from_shop(&self, vehicle_id: &VehicleId) -> Result<Vehicle, FleetError> {
        self.maintain(
            vehicle_id,
            "release_from_shop",
            &[VehicleStatus::InShop],
            VehicleStatus::Available,
        )
    }

    /// Retirement is irreversible; a vehicle on a trip must finish it first.
    pub fn retire_vehicle(&self, vehicle_id: &VehicleId) -> Result<Vehicle, FleetError> {
        self.maintain(
            vehicle_id,
            "retire_vehicle",
            &[VehicleStatus::Available, VehicleStatus::InShop],
            VehicleStatus::Retired,
        )
    }

    fn maintain(
        &self,
        vehicle_id: &VehicleId,
        operation: &'static str,
        allowed_from: &[VehicleStatus],
        target: VehicleStatus,
    ) -> Result<Vehicle, FleetError> {
        self.load_vehicle(vehicle_id)?;

        self.with_conflict_retry(operation, || {
            let _section = self
                .coordinator
                .enter(vec![SectionKey::Vehicle(vehicle_id.clone())])?;

            let mut vehicle = self.load_vehicle(vehicle_id)?;
            if !allowed_from.contains(&vehicle.status) {
                return Err(Ineligibility::VehicleUnavailable {
                    vehicle_id: vehicle.id,
                    status: vehicle.status,
                }
                .into());
            }

            let from = vehicle.status;
            vehicle.status = target;
            vehicle.updated_at = self.clock.now();
            self.store.save_vehicle(vehicle.clone())?;

            info!(vehicle_id = %vehicle.id, operation, from = from.label(), to = target.label(), "vehicle status changed");
            Ok(vehicle)
        })
    }

    pub fn get_trip(&self, trip_id: &TripId) -> Result<Trip, FleetError> {
        self.load_trip(trip_id)
    }

    pub fn list_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>, FleetError> {
        Ok(self.store.list_trips(status)?)
    }

    pub fn get_vehicle(&self, vehicle_id: &VehicleId) -> Result<Vehicle, FleetError> {
        self.load_vehicle(vehicle_id)
    }

    pub fn get_driver(&self, driver_id: &DriverId) -> Result<Driver, FleetError> {
        self.load_driver(driver_id)
    }

    pub fn incidents_for(&self, driver_id: &DriverId) -> Result<Vec<Incident>, FleetError> {
        self.load_driver(driver_id)?;
        Ok(self.store.incidents_for_driver(driver_id)?)
    }
}

fn log_assessment(before: &Driver, assessment: &SafetyAssessment) {
    if before.compliance_status != assessment.compliance_status {
        warn!(
            driver_id = %before.id,
            from = before.compliance_status.label(),
            to = assessment.compliance_status.label(),
            "driver compliance changed"
        );
    }
    info!(driver_id = %before.id, score = assessment.score, incidents = assessment.total_incidents, "safety score recomputed");
}
