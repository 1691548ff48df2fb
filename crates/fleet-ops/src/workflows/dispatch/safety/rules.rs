use chrono::{DateTime, Utc};

use super::super::domain::Incident;
use super::config::SafetyPolicy;
use super::{ScoreComponent, ScoreFactor};

pub(crate) struct ScoreTally {
    pub components: Vec<ScoreComponent>,
    pub raw_score: i32,
    pub recovery_periods: i64,
}

/// Scores the full incident history from scratch. `anchor_without_incidents` stands in for
/// the most recent incident when the history is empty.
pub(crate) fn tally(
    incidents: &[Incident],
    anchor_without_incidents: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &SafetyPolicy,
) -> ScoreTally {
    let mut components = vec![ScoreComponent {
        factor: ScoreFactor::Baseline,
        incident_id: None,
        points: policy.base_score,
        notes: "starting score".to_string(),
    }];
    let mut raw_score = policy.base_score;

    for incident in incidents {
        let type_penalty = policy.type_penalty(incident.kind);
        if type_penalty != 0 {
            components.push(ScoreComponent {
                factor: ScoreFactor::AccidentPenalty,
                incident_id: Some(incident.id.clone()),
                points: -type_penalty,
                notes: "accident deduction".to_string(),
            });
            raw_score -= type_penalty;
        }

        let severity_penalty = policy.severity_penalty(incident.severity);
        components.push(ScoreComponent {
            factor: ScoreFactor::SeverityPenalty,
            incident_id: Some(incident.id.clone()),
            points: -severity_penalty,
            notes: format!("{:?} severity", incident.severity).to_lowercase(),
        });
        raw_score -= severity_penalty;
    }

    let anchor = incidents
        .iter()
        .map(|incident| incident.occurred_at)
        .max()
        .unwrap_or(anchor_without_incidents);

    let recovery_periods = recovery_periods(anchor, now, policy.recovery_period_days);
    if recovery_periods > 0 {
        let bonus = i32::try_from(recovery_periods)
            .unwrap_or(i32::MAX)
            .saturating_mul(policy.recovery_bonus);
        components.push(ScoreComponent {
            factor: ScoreFactor::RecoveryBonus,
            incident_id: None,
            points: bonus,
            notes: format!(
                "{recovery_periods} clean period(s) of {} days",
                policy.recovery_period_days
            ),
        });
        raw_score = raw_score.saturating_add(bonus);
    }

    ScoreTally {
        components,
        raw_score,
        recovery_periods,
    }
}

/// Whole periods elapsed since `anchor`; zero when `anchor` lies in the future.
pub(crate) fn recovery_periods(anchor: DateTime<Utc>, now: DateTime<Utc>, period_days: i64) -> i64 {
    if period_days <= 0 || now <= anchor {
        return 0;
    }
    (now - anchor).num_days() / period_days
}
