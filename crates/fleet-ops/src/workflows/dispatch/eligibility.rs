use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    ComplianceStatus, Driver, DriverId, DutyStatus, Vehicle, VehicleId, VehicleStatus,
};

/// Reason a driver/vehicle pair may not be bound to a new trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligibility {
    #[error("vehicle {vehicle_id} is {} and cannot take a trip", .status.label())]
    VehicleUnavailable {
        vehicle_id: VehicleId,
        status: VehicleStatus,
    },
    #[error("driver {driver_id} is ineligible: {cause}")]
    DriverIneligible {
        driver_id: DriverId,
        cause: DriverIneligibility,
    },
    #[error("driver {driver_id} license expired on {expired_on}")]
    LicenseExpired {
        driver_id: DriverId,
        expired_on: NaiveDate,
    },
    #[error("cargo weight {cargo_weight_kg} kg exceeds vehicle capacity {max_capacity_kg} kg")]
    CapacityExceeded {
        cargo_weight_kg: u32,
        max_capacity_kg: u32,
    },
}

impl Ineligibility {
    pub const fn code(&self) -> &'static str {
        match self {
            Ineligibility::VehicleUnavailable { .. } => "vehicle_unavailable",
            Ineligibility::DriverIneligible { .. } => "driver_ineligible",
            Ineligibility::LicenseExpired { .. } => "license_expired",
            Ineligibility::CapacityExceeded { .. } => "capacity_exceeded",
        }
    }
}

/// Distinguishes why a driver failed the duty/compliance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverIneligibility {
    ComplianceSuspended,
    NotOffDuty { status: DutyStatus },
}

impl fmt::Display for DriverIneligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverIneligibility::ComplianceSuspended => f.write_str("compliance suspended"),
            DriverIneligibility::NotOffDuty { status } => {
                write!(f, "currently {}", status.label())
            }
        }
    }
}

/// Checks a candidate assignment, short-circuiting on the first failure in this order:
/// vehicle availability, driver compliance and duty, license validity, cargo capacity.
pub fn check_assignment(
    vehicle: &Vehicle,
    driver: &Driver,
    cargo_weight_kg: u32,
    today: NaiveDate,
) -> Result<(), Ineligibility> {
    if vehicle.status != VehicleStatus::Available {
        return Err(Ineligibility::VehicleUnavailable {
            vehicle_id: vehicle.id.clone(),
            status: vehicle.status,
        });
    }

    check_driver(driver, today)?;

    if cargo_weight_kg > vehicle.max_capacity_kg {
        return Err(Ineligibility::CapacityExceeded {
            cargo_weight_kg,
            max_capacity_kg: vehicle.max_capacity_kg,
        });
    }

    Ok(())
}

/// Driver-only portion of [`check_assignment`]. The persisted compliance status and the
/// license expiry both gate assignment; the license warning window does not.
pub fn check_driver(driver: &Driver, today: NaiveDate) -> Result<(), Ineligibility> {
    if driver.compliance_status == ComplianceStatus::Suspended {
        return Err(Ineligibility::DriverIneligible {
            driver_id: driver.id.clone(),
            cause: DriverIneligibility::ComplianceSuspended,
        });
    }

    if driver.status != DutyStatus::OffDuty {
        return Err(Ineligibility::DriverIneligible {
            driver_id: driver.id.clone(),
            cause: DriverIneligibility::NotOffDuty {
                status: driver.status,
            },
        });
    }

    if !driver.license_valid_on(today) {
        return Err(Ineligibility::LicenseExpired {
            driver_id: driver.id.clone(),
            expired_on: driver.license_expires_on,
        });
    }

    Ok(())
}

/// Read model answering "can this driver take a trip right now?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverEligibility {
    pub driver_id: DriverId,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Ineligibility>,
    pub compliance_status: ComplianceStatus,
    pub effective_compliance: ComplianceStatus,
}
