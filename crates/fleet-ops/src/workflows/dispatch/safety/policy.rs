use chrono::NaiveDate;

use super::super::domain::{ComplianceStatus, Driver};
use super::config::SafetyPolicy;

/// Maps a clamped score onto a compliance band.
pub fn classify(score: u8, policy: &SafetyPolicy) -> ComplianceStatus {
    let score = i32::from(score);
    if score < policy.suspension_threshold {
        ComplianceStatus::Suspended
    } else if score <= policy.warning_ceiling {
        ComplianceStatus::Warning
    } else {
        ComplianceStatus::Active
    }
}

/// Classification driven only by license expiry: expired suspends, expiring within the
/// warning window warns.
pub fn license_status(
    expires_on: NaiveDate,
    today: NaiveDate,
    policy: &SafetyPolicy,
) -> ComplianceStatus {
    let days_left = (expires_on - today).num_days();
    if days_left <= 0 {
        ComplianceStatus::Suspended
    } else if days_left <= policy.license_warning_days {
        ComplianceStatus::Warning
    } else {
        ComplianceStatus::Active
    }
}

/// Read-time overlay: the more severe of the persisted compliance status and the
/// license-expiry classification. Never written back to the driver record.
pub fn apply_license_expiry_status(
    driver: &Driver,
    today: NaiveDate,
    policy: &SafetyPolicy,
) -> ComplianceStatus {
    driver
        .compliance_status
        .max(license_status(driver.license_expires_on, today, policy))
}
