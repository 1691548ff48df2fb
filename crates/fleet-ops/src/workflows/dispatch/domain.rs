use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered vehicles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

/// Identifier wrapper for onboarded drivers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub String);

/// Identifier wrapper for trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub String);

/// Identifier wrapper for filed safety incidents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub String);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    OnTrip,
    InShop,
    Retired,
}

impl VehicleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::OnTrip => "on_trip",
            VehicleStatus::InShop => "in_shop",
            VehicleStatus::Retired => "retired",
        }
    }
}

/// Work status of a driver. Only trip transitions move a driver on or off duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    OffDuty,
    OnDuty,
    Suspended,
}

impl DutyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DutyStatus::OffDuty => "off_duty",
            DutyStatus::OnDuty => "on_duty",
            DutyStatus::Suspended => "suspended",
        }
    }
}

/// Eligibility classification derived from the safety score. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Active,
    Warning,
    Suspended,
}

impl ComplianceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ComplianceStatus::Active => "active",
            ComplianceStatus::Warning => "warning",
            ComplianceStatus::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Draft,
    Dispatched,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TripStatus::Draft => "draft",
            TripStatus::Dispatched => "dispatched",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Events accepted by the trip state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripEvent {
    Dispatch,
    Complete,
    Cancel,
}

impl TripEvent {
    pub const fn label(self) -> &'static str {
        match self {
            TripEvent::Dispatch => "dispatch",
            TripEvent::Complete => "complete",
            TripEvent::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TripEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Accident,
    Speeding,
    ComplianceFailure,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub max_capacity_kg: u32,
    pub odometer_km: u64,
    pub status: VehicleStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub status: DutyStatus,
    pub license_expires_on: NaiveDate,
    pub safety_score: u8,
    pub compliance_status: ComplianceStatus,
    pub total_incidents: u32,
    pub last_score_updated: Option<DateTime<Utc>>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
    pub assigned_vehicle: Option<VehicleId>,
    pub created_at: DateTime<Utc>,
}

impl Driver {
    /// A license is valid only while its expiry date lies strictly after `today`.
    pub fn license_valid_on(&self, today: NaiveDate) -> bool {
        self.license_expires_on > today
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub cargo_weight_kg: u32,
    pub start_odometer_km: u64,
    pub end_odometer_km: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_cents: Option<u64>,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub driver_id: DriverId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
    #[serde(rename = "type")]
    pub kind: IncidentType,
    pub severity: IncidentSeverity,
    pub description: String,
    pub status: IncidentStatus,
    pub occurred_at: DateTime<Utc>,
    pub filed_by: String,
    pub filed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Inbound request to record a new trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub cargo_weight_kg: u32,
    pub start_odometer_km: u64,
    #[serde(default)]
    pub revenue_cents: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripCompletion {
    pub end_odometer_km: u64,
}

/// Safety officer report of a driver incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub driver_id: DriverId,
    #[serde(default)]
    pub trip_id: Option<TripId>,
    #[serde(rename = "type")]
    pub kind: IncidentType,
    pub severity: IncidentSeverity,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub filed_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentResolution {
    pub resolved_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistration {
    pub id: VehicleId,
    pub name: String,
    pub max_capacity_kg: u32,
    #[serde(default)]
    pub odometer_km: u64,
}

impl VehicleRegistration {
    pub fn into_vehicle(self, now: DateTime<Utc>) -> Vehicle {
        Vehicle {
            id: self.id,
            name: self.name,
            max_capacity_kg: self.max_capacity_kg,
            odometer_km: self.odometer_km,
            status: VehicleStatus::Available,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverOnboarding {
    pub id: DriverId,
    pub name: String,
    pub license_expires_on: NaiveDate,
    #[serde(default)]
    pub onboarded_at: Option<DateTime<Utc>>,
}

impl DriverOnboarding {
    pub fn into_driver(self, now: DateTime<Utc>) -> Driver {
        Driver {
            id: self.id,
            name: self.name,
            status: DutyStatus::OffDuty,
            license_expires_on: self.license_expires_on,
            safety_score: 100,
            compliance_status: ComplianceStatus::Active,
            total_incidents: 0,
            last_score_updated: None,
            suspended_at: None,
            suspension_reason: None,
            assigned_vehicle: None,
            created_at: self.onboarded_at.unwrap_or(now),
        }
    }
}
