//! Outcome records and reward computation.
//!
//! `compute_reward` turns an observed outcome into the scalar signal
//! both bandits and the policy adapter learn from. It is pure,
//! deterministic, and total: absent fields contribute zero and nothing
//! in here performs I/O or draws randomness.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum tolerated deviation from the market price reference before
/// the pricing penalty applies, in percent.
pub const PRICING_TOLERANCE_PCT: f64 = 15.0;

/// Review score (0-10 scale) at or above which the quality bonus applies.
pub const REVIEW_BONUS_FLOOR: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum OutcomeType {
    Win,
    Loss,
    Shortlisted,
    Submitted,
    GatePassed,
}

impl OutcomeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Shortlisted => "shortlisted",
            Self::Submitted => "submitted",
            Self::GatePassed => "gate_passed",
        }
    }

    /// Parse the stored string form. Unknown strings map to `Loss`, the
    /// zero-contribution outcome, so old logs never break reads.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        match raw {
            "win" => Self::Win,
            "shortlisted" => Self::Shortlisted,
            "submitted" => Self::Submitted,
            "gate_passed" => Self::GatePassed,
            _ => Self::Loss,
        }
    }
}

/// An observed outcome as reported by the downstream consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub subject_id: String,
    pub outcome_type: OutcomeType,

    /// Quality/review score on a 0-10 scale, if one was recorded.
    #[serde(default)]
    pub review_score: Option<f64>,

    /// Count of compliance defects reported against the submission.
    #[serde(default)]
    pub compliance_defects: u32,

    /// Whether the required deadline was met. `None` means no deadline
    /// applied.
    #[serde(default)]
    pub deadline_met: Option<bool>,

    /// Deviation of the price/estimate from the market reference, in
    /// percent (signed).
    #[serde(default)]
    pub pricing_deviation_pct: Option<f64>,

    /// Named feature values observed at decision time.
    #[serde(default)]
    pub context_features: BTreeMap<String, f64>,

    /// Decision type / agent that acted on the candidate.
    #[serde(default)]
    pub decision_agent: Option<String>,

    /// Whether a human overrode the automated decision.
    #[serde(default)]
    pub human_override: bool,
}

impl OutcomeReport {
    #[must_use]
    pub fn new(subject_id: impl Into<String>, outcome_type: OutcomeType) -> Self {
        Self {
            subject_id: subject_id.into(),
            outcome_type,
            review_score: None,
            compliance_defects: 0,
            deadline_met: None,
            pricing_deviation_pct: None,
            context_features: BTreeMap::new(),
            decision_agent: None,
            human_override: false,
        }
    }
}

/// The durable, append-only record derived from an outcome. Never
/// mutated after creation; the adapter reads these in batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRecord {
    pub record_id: String,
    pub subject_id: String,
    pub outcome_type: OutcomeType,
    pub reward: f64,
    pub context_features: BTreeMap<String, f64>,
    pub decision_agent: Option<String>,
    pub human_override: bool,
    pub recorded_at: DateTime<Utc>,
}

impl RewardRecord {
    #[must_use]
    pub fn from_report(report: &OutcomeReport, reward: f64) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            subject_id: report.subject_id.clone(),
            outcome_type: report.outcome_type,
            reward,
            context_features: report.context_features.clone(),
            decision_agent: report.decision_agent.clone(),
            human_override: report.human_override,
            recorded_at: Utc::now(),
        }
    }
}

/// Compute the scalar reward for an outcome.
///
/// Additive rule table:
/// - win +10, shortlisted +5, submitted +0.5, gate_passed +0.2
/// - review score >= 8 on the 0-10 scale: +1
/// - each compliance defect: -1
/// - missed deadline: -5
/// - price off the market reference by more than 15% either way: -3
#[must_use]
pub fn compute_reward(outcome: &OutcomeReport) -> f64 {
    let mut reward = match outcome.outcome_type {
        OutcomeType::Win => 10.0,
        OutcomeType::Shortlisted => 5.0,
        OutcomeType::Submitted => 0.5,
        OutcomeType::GatePassed => 0.2,
        OutcomeType::Loss => 0.0,
    };

    if let Some(score) = outcome.review_score {
        if score.is_finite() && score >= REVIEW_BONUS_FLOOR {
            reward += 1.0;
        }
    }

    reward -= f64::from(outcome.compliance_defects);

    if outcome.deadline_met == Some(false) {
        reward -= 5.0;
    }

    if let Some(deviation) = outcome.pricing_deviation_pct {
        if deviation.is_finite() && deviation.abs() > PRICING_TOLERANCE_PCT {
            reward -= 3.0;
        }
    }

    reward
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_with_bonus_and_defect_nets_ten() {
        let mut outcome = OutcomeReport::new("d-1", OutcomeType::Win);
        outcome.review_score = Some(9.0);
        outcome.compliance_defects = 1;
        outcome.deadline_met = Some(true);
        assert!((compute_reward(&outcome) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn reward_is_deterministic() {
        let mut outcome = OutcomeReport::new("d-2", OutcomeType::Shortlisted);
        outcome.pricing_deviation_pct = Some(-20.0);
        outcome.compliance_defects = 2;
        let first = compute_reward(&outcome);
        let second = compute_reward(&outcome);
        assert!((first - second).abs() < f64::EPSILON);
        assert!((first - 0.0).abs() < 1e-12);
    }

    #[test]
    fn absent_fields_contribute_zero() {
        let outcome = OutcomeReport::new("d-3", OutcomeType::Submitted);
        assert!((compute_reward(&outcome) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pricing_penalty_applies_in_both_directions() {
        let mut outcome = OutcomeReport::new("d-4", OutcomeType::GatePassed);
        outcome.pricing_deviation_pct = Some(16.0);
        assert!((compute_reward(&outcome) - (0.2 - 3.0)).abs() < 1e-12);

        outcome.pricing_deviation_pct = Some(-16.0);
        assert!((compute_reward(&outcome) - (0.2 - 3.0)).abs() < 1e-12);

        outcome.pricing_deviation_pct = Some(15.0);
        assert!((compute_reward(&outcome) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn missed_deadline_penalizes_five() {
        let mut outcome = OutcomeReport::new("d-5", OutcomeType::Loss);
        outcome.deadline_met = Some(false);
        assert!((compute_reward(&outcome) + 5.0).abs() < 1e-12);
    }

    #[test]
    fn review_bonus_needs_eight_or_better() {
        let mut outcome = OutcomeReport::new("d-6", OutcomeType::Loss);
        outcome.review_score = Some(7.9);
        assert!((compute_reward(&outcome) - 0.0).abs() < 1e-12);
        outcome.review_score = Some(8.0);
        assert!((compute_reward(&outcome) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn stored_form_round_trips() {
        for outcome in [
            OutcomeType::Win,
            OutcomeType::Loss,
            OutcomeType::Shortlisted,
            OutcomeType::Submitted,
            OutcomeType::GatePassed,
        ] {
            assert_eq!(OutcomeType::from_stored(outcome.as_str()), outcome);
        }
        assert_eq!(OutcomeType::from_stored("mystery"), OutcomeType::Loss);
    }
}
