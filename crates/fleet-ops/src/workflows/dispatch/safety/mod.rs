//! Incident-driven driver safety scoring.
//!
//! The score is a projection of the driver's complete incident ledger: every recompute
//! starts from the base score and replays all incidents, then adds a recovery bonus for
//! each full period elapsed since the most recent incident.

mod config;
mod policy;
mod rules;

pub use config::SafetyPolicy;
pub use policy::{apply_license_expiry_status, classify, license_status};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ComplianceStatus, Driver, DriverId, Incident, IncidentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Baseline,
    AccidentPenalty,
    SeverityPenalty,
    RecoveryBonus,
}

/// Discrete contribution to a safety score, kept for audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<IncidentId>,
    pub points: i32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub driver_id: DriverId,
    pub score: u8,
    pub compliance_status: ComplianceStatus,
    pub total_incidents: u32,
    pub recovery_periods: i64,
    pub components: Vec<ScoreComponent>,
    pub assessed_at: DateTime<Utc>,
}

/// Stateless evaluator applying a [`SafetyPolicy`] to an incident history.
#[derive(Debug, Clone, Default)]
pub struct SafetyScoreEngine {
    policy: SafetyPolicy,
}

impl SafetyScoreEngine {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Scores `incidents` (the driver's full history) as of `now` without touching the driver.
    pub fn assess(
        &self,
        driver: &Driver,
        incidents: &[Incident],
        now: DateTime<Utc>,
    ) -> SafetyAssessment {
        let tally = rules::tally(incidents, driver.created_at, now, &self.policy);
        let score = tally.raw_score.clamp(0, 100) as u8;

        SafetyAssessment {
            driver_id: driver.id.clone(),
            score,
            compliance_status: classify(score, &self.policy),
            total_incidents: u32::try_from(incidents.len()).unwrap_or(u32::MAX),
            recovery_periods: tally.recovery_periods,
            components: tally.components,
            assessed_at: now,
        }
    }

    /// Scores the history and writes the safety fields onto `driver`. Duty fields are
    /// left alone; a suspended driver already on a trip finishes it.
    pub fn recompute(
        &self,
        driver: &mut Driver,
        incidents: &[Incident],
        now: DateTime<Utc>,
    ) -> SafetyAssessment {
        let assessment = self.assess(driver, incidents, now);

        driver.safety_score = assessment.score;
        driver.total_incidents = assessment.total_incidents;
        driver.last_score_updated = Some(now);
        driver.compliance_status = assessment.compliance_status;

        match assessment.compliance_status {
            ComplianceStatus::Suspended => {
                if driver.suspended_at.is_none() {
                    driver.suspended_at = Some(now);
                }
                driver.suspension_reason = Some(format!(
                    "safety score {} below {}",
                    assessment.score, self.policy.suspension_threshold
                ));
            }
            ComplianceStatus::Active => {
                driver.suspended_at = None;
                driver.suspension_reason = None;
            }
            ComplianceStatus::Warning => {}
        }

        assessment
    }
}
