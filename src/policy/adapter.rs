//! Periodic policy adaptation over accumulated reward records.
//!
//! Runs the batch cycle `Idle -> Aggregating -> Computing -> Persisting
//! -> Idle`. An underfilled window aborts cleanly to "not updated" and
//! leaves stored policy untouched; a persist failure on one policy never
//! blocks the other.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::policy::thresholds::{ConfidenceThresholds, ThresholdChange};
use crate::policy::weights::{PolicyWeights, WeightChange};
use crate::store::outcomes::OutcomeStore;
use crate::store::policies::PolicyStore;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdapterConfig {
    /// Most recent records pulled per cycle.
    pub max_records: usize,

    /// Below this many records the cycle aborts without touching policy.
    pub min_records: usize,

    pub learning_rate: f64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_records: 200,
            min_records: 10,
            learning_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Phase {
    Idle,
    Aggregating,
    Computing,
    Persisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationStatus {
    Updated,
    NotUpdated,
}

/// Operator-visible result of one adaptation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptationReport {
    pub status: AdaptationStatus,
    pub records_seen: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub weight_changes: Vec<WeightChange>,
    pub threshold_changes: Vec<ThresholdChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds_version: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AdaptationReport {
    fn not_updated(records_seen: usize, reason: impl Into<String>) -> Self {
        Self {
            status: AdaptationStatus::NotUpdated,
            records_seen,
            reason: Some(reason.into()),
            weight_changes: Vec::new(),
            threshold_changes: Vec::new(),
            weights_version: None,
            thresholds_version: None,
            errors: Vec::new(),
        }
    }

    /// Human-readable old-vs-new summary for the audit trail.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        match self.status {
            AdaptationStatus::NotUpdated => {
                lines.push(format!(
                    "not updated: {} ({} records)",
                    self.reason.as_deref().unwrap_or("unknown"),
                    self.records_seen
                ));
            }
            AdaptationStatus::Updated => {
                lines.push(format!("adapted over {} records", self.records_seen));
                for c in &self.weight_changes {
                    lines.push(format!("  weight {}: {:.4} -> {:.4}", c.name, c.old, c.new));
                }
                for c in &self.threshold_changes {
                    lines.push(format!(
                        "  threshold {}: {:.2} -> {:.2} (accuracy {:.2} over {})",
                        c.decision_type, c.old, c.new, c.accuracy, c.outcomes
                    ));
                }
                if self.weight_changes.is_empty() && self.threshold_changes.is_empty() {
                    lines.push("  no change beyond epsilon".to_string());
                }
            }
        }
        for err in &self.errors {
            lines.push(format!("  error: {err}"));
        }
        lines.join("\n")
    }
}

pub struct PolicyAdapter<'a> {
    cfg: AdapterConfig,
    outcomes: &'a OutcomeStore,
    policies: &'a PolicyStore,
    phase: Phase,
}

impl<'a> PolicyAdapter<'a> {
    #[must_use]
    pub const fn new(
        cfg: AdapterConfig,
        outcomes: &'a OutcomeStore,
        policies: &'a PolicyStore,
    ) -> Self {
        Self {
            cfg,
            outcomes,
            policies,
            phase: Phase::Idle,
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "adapter phase");
        self.phase = phase;
    }

    /// Run one adaptation cycle.
    ///
    /// Errors reading the outcome window propagate (the scheduler
    /// retries on the next trigger); persist errors are isolated per
    /// policy and reported, not raised.
    pub fn run(&mut self) -> Result<AdaptationReport> {
        self.enter(Phase::Aggregating);
        let records = self.outcomes.recent(self.cfg.max_records)?;
        if records.len() < self.cfg.min_records {
            self.enter(Phase::Idle);
            return Ok(AdaptationReport::not_updated(
                records.len(),
                format!(
                    "need at least {} records, have {}",
                    self.cfg.min_records,
                    records.len()
                ),
            ));
        }

        self.enter(Phase::Computing);
        let (weights, weights_version) = self.policies.load_weights().unwrap_or_else(|err| {
            warn!(error = %err, "weights unreadable, adapting from defaults");
            (PolicyWeights::default(), 0)
        });
        let (thresholds, thresholds_version) =
            self.policies.load_thresholds().unwrap_or_else(|err| {
                warn!(error = %err, "thresholds unreadable, adapting from defaults");
                (ConfidenceThresholds::default(), 0)
            });

        let adapted_weights = weights.adapt(&records, self.cfg.learning_rate);
        let weight_changes = weights.diff(&adapted_weights);
        let (adapted_thresholds, threshold_changes) = thresholds.adapt(&records);

        self.enter(Phase::Persisting);
        let mut errors = Vec::new();

        let reason = format!("adaptation over {} records", records.len());
        let new_weights_version = match self
            .policies
            .save_weights(&adapted_weights, weights_version, &reason)
        {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(error = %err, "failed to persist weights");
                errors.push(format!("weights: {err}"));
                None
            }
        };
        let new_thresholds_version = match self.policies.save_thresholds(
            &adapted_thresholds,
            thresholds_version,
            &reason,
        ) {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(error = %err, "failed to persist thresholds");
                errors.push(format!("thresholds: {err}"));
                None
            }
        };

        self.enter(Phase::Idle);

        let status = if new_weights_version.is_some() || new_thresholds_version.is_some() {
            AdaptationStatus::Updated
        } else {
            AdaptationStatus::NotUpdated
        };
        Ok(AdaptationReport {
            status,
            records_seen: records.len(),
            reason: (status == AdaptationStatus::NotUpdated)
                .then(|| "no policy could be persisted".to_string()),
            weight_changes,
            threshold_changes,
            weights_version: new_weights_version,
            thresholds_version: new_thresholds_version,
            errors,
        })
    }
}
