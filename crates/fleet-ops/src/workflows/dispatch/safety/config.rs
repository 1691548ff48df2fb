use serde::{Deserialize, Serialize};

use super::super::domain::{IncidentSeverity, IncidentType};

/// Scoring dials for the safety engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    pub base_score: i32,
    /// Flat deduction for accidents, applied before the severity penalty.
    pub accident_penalty: i32,
    pub low_severity_penalty: i32,
    pub medium_severity_penalty: i32,
    pub high_severity_penalty: i32,
    pub recovery_period_days: i64,
    pub recovery_bonus: i32,
    /// Scores strictly below this suspend the driver.
    pub suspension_threshold: i32,
    /// Scores up to and including this value (and at or above the suspension threshold)
    /// put the driver on warning.
    pub warning_ceiling: i32,
    pub license_warning_days: i64,
}

impl SafetyPolicy {
    pub fn severity_penalty(&self, severity: IncidentSeverity) -> i32 {
        match severity {
            IncidentSeverity::Low => self.low_severity_penalty,
            IncidentSeverity::Medium => self.medium_severity_penalty,
            IncidentSeverity::High => self.high_severity_penalty,
        }
    }

    pub fn type_penalty(&self, kind: IncidentType) -> i32 {
        match kind {
            IncidentType::Accident => self.accident_penalty,
            IncidentType::Speeding | IncidentType::ComplianceFailure | IncidentType::Other => 0,
        }
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            base_score: 100,
            accident_penalty: 10,
            low_severity_penalty: 5,
            medium_severity_penalty: 10,
            high_severity_penalty: 15,
            recovery_period_days: 90,
            recovery_bonus: 5,
            suspension_threshold: 50,
            warning_ceiling: 70,
            license_warning_days: 30,
        }
    }
}
