//! Scoring-feature weights and their batch adaptation.
//!
//! Positive weights combine into a composite fit score and are kept
//! normalized to sum 1.0. Penalty features (competition, risk) are
//! fixed-sign negative and never rescaled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rewards::RewardRecord;

/// Clip band for positive weights.
pub const POSITIVE_BAND: (f64, f64) = (0.01, 0.50);

/// Clip band for fixed-sign penalty weights.
pub const PENALTY_BAND: (f64, f64) = (-0.20, -0.01);

/// Changes smaller than this are not reported in change summaries.
pub const CHANGE_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyWeights {
    pub weights: BTreeMap<String, f64>,
}

/// One reported weight adjustment, old value vs new.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub name: String,
    pub old: f64,
    pub new: f64,
}

impl Default for PolicyWeights {
    /// Documented default weights: six positive scoring features summing
    /// to 1.0 plus two fixed-sign penalty features.
    fn default() -> Self {
        let weights = BTreeMap::from(
            [
                ("agency_history", 0.15),
                ("capability_fit", 0.15),
                ("competition_penalty", -0.10),
                ("keyword_overlap", 0.15),
                ("naics_match", 0.20),
                ("past_performance", 0.20),
                ("risk_penalty", -0.05),
                ("vehicle_access", 0.15),
            ]
            .map(|(k, v)| (k.to_string(), v)),
        );
        Self { weights }
    }
}

impl PolicyWeights {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    /// Sum of all positive weights.
    #[must_use]
    pub fn positive_sum(&self) -> f64 {
        self.weights.values().filter(|w| **w > 0.0).sum()
    }

    /// Canonical feature order: sorted names, positive scoring features
    /// only. This is the ordering used to project named feature maps
    /// onto LinUCB context vectors.
    #[must_use]
    pub fn feature_order(&self) -> Vec<String> {
        self.weights.keys().cloned().collect()
    }

    /// Rescale positive weights to sum 1.0. Penalty weights are left
    /// untouched. A state with no positive mass is left unchanged.
    pub fn normalize_positive(&mut self) {
        let total = self.positive_sum();
        if total <= 0.0 || !total.is_finite() {
            return;
        }
        for w in self.weights.values_mut() {
            if *w > 0.0 {
                *w /= total;
            }
        }
    }

    /// One batch adaptation step over a window of reward records.
    ///
    /// For each feature the gradient is the mean of
    /// `reward * feature_value` over the batch - a policy-gradient
    /// approximation, not a true loss gradient; it points weights toward
    /// features that co-occur with reward, nothing stronger. New weights
    /// are clipped to their sign band and positives renormalized.
    ///
    /// An empty batch is the identity: the input weights come back
    /// unchanged.
    #[must_use]
    pub fn adapt(&self, records: &[RewardRecord], learning_rate: f64) -> Self {
        if records.is_empty() {
            return self.clone();
        }
        let n = records.len() as f64;
        let mut adapted = self.clone();
        for (name, weight) in &mut adapted.weights {
            let gradient: f64 = records
                .iter()
                .map(|r| r.reward * r.context_features.get(name).copied().unwrap_or(0.0))
                .sum::<f64>()
                / n;
            let stepped = *weight + learning_rate * gradient;
            let (lo, hi) = if *weight < 0.0 {
                PENALTY_BAND
            } else {
                POSITIVE_BAND
            };
            *weight = if stepped.is_finite() {
                stepped.clamp(lo, hi)
            } else {
                *weight
            };
        }
        adapted.normalize_positive();
        adapted
    }

    /// Per-feature changes against another weight set, filtered by
    /// [`CHANGE_EPSILON`].
    #[must_use]
    pub fn diff(&self, updated: &Self) -> Vec<WeightChange> {
        updated
            .weights
            .iter()
            .filter_map(|(name, new)| {
                let old = self.get(name).unwrap_or(0.0);
                ((new - old).abs() > CHANGE_EPSILON).then(|| WeightChange {
                    name: name.clone(),
                    old,
                    new: *new,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::{OutcomeReport, OutcomeType, RewardRecord, compute_reward};

    fn record(reward: f64, features: &[(&str, f64)]) -> RewardRecord {
        let mut report = OutcomeReport::new("d", OutcomeType::Win);
        report.context_features = features
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect();
        RewardRecord::from_report(&report, reward)
    }

    #[test]
    fn defaults_have_unit_positive_mass() {
        let weights = PolicyWeights::default();
        assert!((weights.positive_sum() - 1.0).abs() < 1e-9);
        assert!(weights.get("competition_penalty").unwrap() < 0.0);
        assert!(weights.get("risk_penalty").unwrap() < 0.0);
    }

    #[test]
    fn empty_batch_is_identity() {
        let weights = PolicyWeights::default();
        assert_eq!(weights.adapt(&[], 0.05), weights);
    }

    #[test]
    fn rewarded_feature_gains_weight() {
        let weights = PolicyWeights::default();
        let records: Vec<RewardRecord> = (0..10)
            .map(|_| record(5.0, &[("naics_match", 1.0)]))
            .collect();
        let adapted = weights.adapt(&records, 0.05);

        // naics_match started at 0.20, absorbed the whole positive
        // gradient, and must strictly increase after renormalization.
        assert!(adapted.get("naics_match").unwrap() > weights.get("naics_match").unwrap());
        assert!((adapted.positive_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn penalty_weights_stay_in_band() {
        let weights = PolicyWeights::default();
        let records: Vec<RewardRecord> = (0..20)
            .map(|_| record(10.0, &[("competition_penalty", 1.0)]))
            .collect();
        let adapted = weights.adapt(&records, 0.05);
        let penalty = adapted.get("competition_penalty").unwrap();
        assert!((PENALTY_BAND.0..=PENALTY_BAND.1).contains(&penalty));
    }

    #[test]
    fn positive_weights_stay_clipped_before_renormalization() {
        let weights = PolicyWeights::default();
        let records: Vec<RewardRecord> =
            (0..50).map(|_| record(11.0, &[("naics_match", 1.0)])).collect();
        let adapted = weights.adapt(&records, 0.05);
        // Clipped to 0.50, then renormalized with the untouched rest:
        // never allowed to swallow the whole positive mass.
        assert!(adapted.get("naics_match").unwrap() < 0.51);
        assert!((adapted.positive_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn diff_filters_below_epsilon() {
        let weights = PolicyWeights::default();
        let mut updated = weights.clone();
        updated
            .weights
            .insert("naics_match".to_string(), 0.2005);
        assert!(weights.diff(&updated).is_empty());

        updated.weights.insert("naics_match".to_string(), 0.25);
        let changes = weights.diff(&updated);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "naics_match");
    }

    #[test]
    fn adapt_uses_real_reward_pipeline() {
        // End-to-end shape check: reward computed from an outcome, not
        // hand-assembled.
        let mut report = OutcomeReport::new("d-9", OutcomeType::Win);
        report.review_score = Some(9.0);
        report.compliance_defects = 1;
        report
            .context_features
            .insert("past_performance".to_string(), 1.0);
        let reward = compute_reward(&report);
        let records = vec![RewardRecord::from_report(&report, reward)];

        let weights = PolicyWeights::default();
        let adapted = weights.adapt(&records, 0.03);
        assert!(adapted.get("past_performance").unwrap() > weights.get("past_performance").unwrap());
    }
}
