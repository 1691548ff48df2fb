use super::common::*;
use chrono::NaiveDate;

use crate::workflows::dispatch::domain::{ComplianceStatus, DutyStatus, VehicleStatus};
use crate::workflows::dispatch::eligibility::{
    check_assignment, check_driver, DriverIneligibility, Ineligibility,
};

#[test]
fn available_pair_within_capacity_is_assignable() {
    assert_eq!(check_assignment(&vehicle(), &driver(), 400, today()), Ok(()));
}

#[test]
fn cargo_equal_to_capacity_is_accepted() {
    assert_eq!(check_assignment(&vehicle(), &driver(), 1000, today()), Ok(()));
}

#[test]
fn cargo_over_capacity_is_rejected() {
    let err = check_assignment(&vehicle(), &driver(), 1001, today()).unwrap_err();
    assert_eq!(
        err,
        Ineligibility::CapacityExceeded {
            cargo_weight_kg: 1001,
            max_capacity_kg: 1000,
        }
    );
}

#[test]
fn vehicle_checks_run_before_driver_checks() {
    let mut vehicle = vehicle();
    vehicle.status = VehicleStatus::InShop;
    let mut driver = driver();
    driver.compliance_status = ComplianceStatus::Suspended;

    let err = check_assignment(&vehicle, &driver, 5000, today()).unwrap_err();
    assert_eq!(err.code(), "vehicle_unavailable");
}

#[test]
fn retired_and_busy_vehicles_are_unavailable() {
    for status in [VehicleStatus::OnTrip, VehicleStatus::Retired] {
        let mut vehicle = vehicle();
        vehicle.status = status;
        assert!(matches!(
            check_assignment(&vehicle, &driver(), 10, today()),
            Err(Ineligibility::VehicleUnavailable { status: reported, .. }) if reported == status
        ));
    }
}

#[test]
fn suspended_compliance_blocks_before_duty_status() {
    let mut driver = driver();
    driver.compliance_status = ComplianceStatus::Suspended;
    driver.status = DutyStatus::OnDuty;

    let err = check_driver(&driver, today()).unwrap_err();
    assert!(matches!(
        err,
        Ineligibility::DriverIneligible {
            cause: DriverIneligibility::ComplianceSuspended,
            ..
        }
    ));
}

#[test]
fn on_duty_driver_is_not_assignable() {
    let mut driver = driver();
    driver.status = DutyStatus::OnDuty;

    let err = check_driver(&driver, today()).unwrap_err();
    assert_eq!(
        err,
        Ineligibility::DriverIneligible {
            driver_id: driver_id(),
            cause: DriverIneligibility::NotOffDuty {
                status: DutyStatus::OnDuty,
            },
        }
    );
}

#[test]
fn warning_compliance_does_not_block() {
    let mut driver = driver();
    driver.compliance_status = ComplianceStatus::Warning;
    assert!(check_driver(&driver, today()).is_ok());
}

#[test]
fn license_expiring_today_is_already_invalid() {
    let mut driver = driver();
    driver.license_expires_on = today();

    let err = check_driver(&driver, today()).unwrap_err();
    assert_eq!(
        err,
        Ineligibility::LicenseExpired {
            driver_id: driver_id(),
            expired_on: today(),
        }
    );
}

#[test]
fn license_expiring_tomorrow_is_still_valid() {
    let mut driver = driver();
    driver.license_expires_on = today().succ_opt().expect("valid date");
    assert!(check_driver(&driver, today()).is_ok());
}

#[test]
fn rejection_reasons_serialize_with_a_reason_tag() {
    let err = Ineligibility::LicenseExpired {
        driver_id: driver_id(),
        expired_on: NaiveDate::from_ymd_opt(2026, 1, 31).expect("valid date"),
    };
    let payload = serde_json::to_value(&err).expect("serializes");

    assert_eq!(payload["reason"], "license_expired");
    assert_eq!(payload["expired_on"], "2026-01-31");
    assert_eq!(
        err.to_string(),
        "driver drv-1 license expired on 2026-01-31"
    );
}
