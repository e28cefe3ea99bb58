//! Per-decision-type confidence thresholds.
//!
//! Each decision type carries the confidence an automated action needs
//! before it may proceed without human review. Thresholds are adjusted
//! in place from observed accuracy, never recreated, and always stay in
//! the [0.60, 0.95] band.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::rewards::RewardRecord;

pub const THRESHOLD_FLOOR: f64 = 0.60;
pub const THRESHOLD_CEILING: f64 = 0.95;

/// Step down (more autonomy) when accuracy is high.
pub const LOWER_STEP: f64 = 0.02;

/// Step up (more review) when accuracy is low.
pub const RAISE_STEP: f64 = 0.05;

pub const HIGH_ACCURACY: f64 = 0.85;
pub const LOW_ACCURACY: f64 = 0.65;

/// Minimum recorded outcomes before a decision type's threshold moves.
pub const MIN_OUTCOMES: usize = 5;

/// Starting threshold for decision types seen for the first time.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub thresholds: BTreeMap<String, f64>,
}

/// One reported threshold adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdChange {
    pub decision_type: String,
    pub old: f64,
    pub new: f64,
    pub accuracy: f64,
    pub outcomes: usize,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        let thresholds = BTreeMap::from(
            [
                ("bid_decision", 0.75),
                ("pricing", 0.85),
                ("submission", 0.80),
                ("teaming", 0.70),
            ]
            .map(|(k, v)| (k.to_string(), v)),
        );
        Self { thresholds }
    }
}

impl ConfidenceThresholds {
    #[must_use]
    pub fn get(&self, decision_type: &str) -> f64 {
        self.thresholds
            .get(decision_type)
            .copied()
            .unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Adjust thresholds from a batch of reward records.
    ///
    /// For every decision type with at least [`MIN_OUTCOMES`] records,
    /// accuracy is the fraction of outcomes where no human override
    /// occurred and the reward was positive. High accuracy grants more
    /// autonomy (threshold down), low accuracy requires more review
    /// (threshold up); the middle band leaves the threshold alone.
    #[must_use]
    pub fn adapt(&self, records: &[RewardRecord]) -> (Self, Vec<ThresholdChange>) {
        let mut adapted = self.clone();
        let mut changes = Vec::new();

        let by_agent = records
            .iter()
            .filter_map(|r| r.decision_agent.as_deref().map(|agent| (agent, r)))
            .into_group_map();

        for (agent, group) in by_agent {
            if group.len() < MIN_OUTCOMES {
                continue;
            }
            let hits = group
                .iter()
                .filter(|r| !r.human_override && r.reward > 0.0)
                .count();
            let accuracy = hits as f64 / group.len() as f64;

            let old = adapted.get(agent);
            let new = if accuracy > HIGH_ACCURACY {
                (old - LOWER_STEP).max(THRESHOLD_FLOOR)
            } else if accuracy < LOW_ACCURACY {
                (old + RAISE_STEP).min(THRESHOLD_CEILING)
            } else {
                old
            };

            if (new - old).abs() > f64::EPSILON {
                adapted.thresholds.insert(agent.to_string(), new);
                changes.push(ThresholdChange {
                    decision_type: agent.to_string(),
                    old,
                    new,
                    accuracy,
                    outcomes: group.len(),
                });
            }
        }

        changes.sort_by(|a, b| a.decision_type.cmp(&b.decision_type));
        (adapted, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::{OutcomeReport, OutcomeType, RewardRecord};

    fn record(agent: &str, reward: f64, human_override: bool) -> RewardRecord {
        let mut report = OutcomeReport::new("d", OutcomeType::Win);
        report.decision_agent = Some(agent.to_string());
        report.human_override = human_override;
        RewardRecord::from_report(&report, reward)
    }

    #[test]
    fn high_accuracy_lowers_threshold_by_exact_step() {
        let thresholds = ConfidenceThresholds::default();
        // 10 outcomes, 9 clean wins: accuracy 0.9, autonomy grows by
        // exactly 0.02.
        let mut records: Vec<RewardRecord> =
            (0..9).map(|_| record("bid_decision", 10.0, false)).collect();
        records.push(record("bid_decision", -1.0, false));

        let (adapted, changes) = thresholds.adapt(&records);
        assert_eq!(changes.len(), 1);
        assert!((changes[0].accuracy - 0.9).abs() < 1e-12);
        assert!((adapted.get("bid_decision") - 0.73).abs() < 1e-12);
    }

    #[test]
    fn threshold_never_drops_below_floor() {
        let mut thresholds = ConfidenceThresholds::default();
        thresholds
            .thresholds
            .insert("bid_decision".to_string(), 0.61);
        let records: Vec<RewardRecord> =
            (0..10).map(|_| record("bid_decision", 10.0, false)).collect();
        let (adapted, _) = thresholds.adapt(&records);
        assert!((adapted.get("bid_decision") - THRESHOLD_FLOOR).abs() < 1e-12);

        // Already at the floor: no further change is reported.
        let (again, changes) = adapted.adapt(&records);
        assert!((again.get("bid_decision") - THRESHOLD_FLOOR).abs() < 1e-12);
        assert!(changes.is_empty());
    }

    #[test]
    fn low_accuracy_raises_threshold_toward_ceiling() {
        let thresholds = ConfidenceThresholds::default();
        let records: Vec<RewardRecord> = (0..8)
            .map(|i| record("pricing", if i < 2 { 10.0 } else { -2.0 }, i % 3 == 0))
            .collect();
        let (adapted, _) = thresholds.adapt(&records);
        assert!((adapted.get("pricing") - 0.90).abs() < 1e-12);
    }

    #[test]
    fn small_samples_leave_thresholds_alone() {
        let thresholds = ConfidenceThresholds::default();
        let records: Vec<RewardRecord> =
            (0..4).map(|_| record("teaming", 10.0, false)).collect();
        let (adapted, changes) = thresholds.adapt(&records);
        assert_eq!(adapted, thresholds);
        assert!(changes.is_empty());
    }

    #[test]
    fn unseen_decision_types_start_from_default() {
        let thresholds = ConfidenceThresholds::default();
        let records: Vec<RewardRecord> =
            (0..6).map(|_| record("legal_review", 10.0, false)).collect();
        let (adapted, _) = thresholds.adapt(&records);
        assert!((adapted.get("legal_review") - (DEFAULT_THRESHOLD - LOWER_STEP)).abs() < 1e-12);
    }

    #[test]
    fn overrides_count_against_accuracy() {
        let thresholds = ConfidenceThresholds::default();
        // Positive rewards, but every decision was overridden by a
        // human: accuracy 0, threshold must rise.
        let records: Vec<RewardRecord> =
            (0..6).map(|_| record("submission", 10.0, true)).collect();
        let (adapted, _) = thresholds.adapt(&records);
        assert!((adapted.get("submission") - 0.85).abs() < 1e-12);
    }
}
