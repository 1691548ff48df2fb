//! Trip dispatch, resource eligibility, and driver safety scoring.
//!
//! [`FleetDispatchService`] is the single entry point. It validates assignments through
//! [`eligibility`], drives trips through the [`lifecycle`] state machine, serializes work on
//! shared vehicles and drivers through the [`coordinator`], and keeps driver compliance in
//! step with the incident ledger through [`safety`].

pub mod coordinator;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod router;
pub mod safety;
pub mod service;

#[cfg(test)]
mod tests;

pub use coordinator::{
    ConsistencyCoordinator, ExclusiveSections, LedgerWrite, SectionGuard, SectionKey, Snapshot,
};
pub use domain::{
    ComplianceStatus, Driver, DriverId, DriverOnboarding, DutyStatus, Incident, IncidentId,
    IncidentReport, IncidentResolution, IncidentSeverity, IncidentStatus, IncidentType, Trip,
    TripCompletion, TripEvent, TripId, TripRequest, TripStatus, Vehicle, VehicleId,
    VehicleRegistration, VehicleStatus,
};
pub use eligibility::{check_assignment, DriverEligibility, DriverIneligibility, Ineligibility};
pub use error::FleetError;
pub use lifecycle::{TransitionError, TransitionPlan};
pub use memory::InMemoryFleetStore;
pub use repository::{
    Clock, DriverDirectory, FleetStore, IncidentLedger, ManualClock, RepositoryError,
    SystemClock, TripRepository, VehicleDirectory,
};
pub use router::fleet_router;
pub use safety::{SafetyAssessment, SafetyPolicy, SafetyScoreEngine, ScoreComponent, ScoreFactor};
pub use service::{DriverSafetyProfile, FiledIncident, FleetDispatchService};
