//! Selection engine: the explicit state container behind every command.
//!
//! Owns both bandits behind locks, the outcome log, the policy store,
//! and the snapshot store. One engine is constructed per process from
//! config and persisted state; an fs2 file lock keeps each cycle a
//! single-owner affair across processes.
//!
//! Failure policy mirrors the two scheduling paths: the selection (hot)
//! path always degrades to a safe default and keeps going; the
//! adaptation (batch) path aborts cleanly and retries on the next
//! trigger.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::bandit::{
    BetaBandit, Candidate, LinUcbBandit, LinUcbConfig, SelectionPath, Selection, select_top_k,
};
use crate::config::Config;
use crate::error::{Result, SiftError};
use crate::policy::{AdaptationReport, AdapterConfig, PolicyAdapter};
use crate::rewards::{OutcomeReport, RewardRecord, compute_reward};
use crate::store::{BanditStore, OutcomeStore, PolicyStore};

/// Result of recording one outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedOutcome {
    pub record_id: String,
    pub reward: f64,

    /// False when the outcome store was unavailable and the record only
    /// reached the in-memory bandits.
    pub persisted: bool,
}

/// Per-arm posterior summary for operator status output.
#[derive(Debug, Clone, Serialize)]
pub struct ArmSummary {
    pub id: String,
    pub alpha: f64,
    pub beta: f64,
    pub mean: f64,
}

pub struct SelectionEngine {
    beta: RwLock<BetaBandit>,
    linucb: RwLock<LinUcbBandit>,
    outcomes: Option<OutcomeStore>,
    policies: PolicyStore,
    bandit_store: BanditStore,
    adapter_cfg: AdapterConfig,
    /// Canonical ordering used to project named feature maps onto
    /// LinUCB context vectors: the policy weight names, sorted.
    feature_order: Vec<String>,
    root: PathBuf,
    _lock: File,
}

impl SelectionEngine {
    /// Open the engine over a state directory, loading persisted bandit
    /// and policy state.
    ///
    /// Unreadable stores degrade: bandits fall back to fresh state and
    /// outcome recording goes in-memory-only, each with a warning. A
    /// held directory lock is the only fatal condition.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        std::fs::create_dir_all(root)?;

        let lock = File::create(root.join(".lock"))?;
        lock.try_lock_exclusive()
            .map_err(|_| SiftError::StateLocked(root.to_path_buf()))?;

        let bandit_store = BanditStore::open(root.join("bandits"))?;
        let beta = match bandit_store.load_beta() {
            Ok(Some(state)) => BetaBandit::from_snapshot(state),
            Ok(None) => BetaBandit::new(config.bandit.seed),
            Err(err) => {
                warn!(error = %err, "beta snapshot unreadable, starting fresh");
                BetaBandit::new(config.bandit.seed)
            }
        };
        let linucb_cfg = LinUcbConfig {
            dim: config.bandit.dim,
            explore_rate: config.bandit.explore_rate,
            lambda: config.bandit.lambda,
        };
        let linucb = match bandit_store.load_linucb() {
            Ok(Some(state)) => LinUcbBandit::from_snapshot(state, config.bandit.lambda),
            Ok(None) => LinUcbBandit::new(linucb_cfg),
            Err(err) => {
                warn!(error = %err, "linucb snapshot unreadable, starting fresh");
                LinUcbBandit::new(linucb_cfg)
            }
        };

        let outcomes = match OutcomeStore::open(root.join("outcomes.db")) {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(error = %err, "outcome store unavailable, records will not persist");
                None
            }
        };

        let policies = PolicyStore::open(root.join("policies"))?;
        let feature_order = match policies.load_weights() {
            Ok((weights, _)) => weights.feature_order(),
            Err(err) => {
                warn!(error = %err, "weights unreadable, using default feature order");
                crate::policy::PolicyWeights::default().feature_order()
            }
        };

        Ok(Self {
            beta: RwLock::new(beta),
            linucb: RwLock::new(linucb),
            outcomes,
            policies,
            bandit_store,
            adapter_cfg: AdapterConfig {
                max_records: config.adapter.max_records,
                min_records: config.adapter.min_records,
                learning_rate: config.adapter.learning_rate,
            },
            feature_order,
            root: root.to_path_buf(),
            _lock: lock,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn policies(&self) -> &PolicyStore {
        &self.policies
    }

    /// Select up to `k` candidates from the pool.
    pub fn select(
        &self,
        pool: &[Candidate],
        k: usize,
        prefer_contextual: bool,
    ) -> (Vec<Selection>, SelectionPath) {
        let mut beta = self.beta.write();
        let mut linucb = self.linucb.write();
        let (picked, path) = select_top_k(&mut beta, &mut linucb, pool, k, prefer_contextual);
        info!(pool = pool.len(), k, ?path, picked = picked.len(), "selection");
        (picked, path)
    }

    /// Compute the reward for an outcome, append the durable record,
    /// and fold the reward into both bandits.
    ///
    /// Updates to the same arm are serialized by the write lock in
    /// arrival order. A missing outcome store downgrades persistence,
    /// never the learning update.
    pub fn record_outcome(&self, report: &OutcomeReport) -> RecordedOutcome {
        let reward = compute_reward(report);
        let record = RewardRecord::from_report(report, reward);

        let persisted = match &self.outcomes {
            Some(store) => match store.append(&record) {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, record_id = %record.record_id, "outcome not persisted");
                    false
                }
            },
            None => false,
        };

        self.beta.write().update(&report.subject_id, reward);
        if !report.context_features.is_empty() {
            let context = self.project_features(&record);
            self.linucb
                .write()
                .update(&report.subject_id, &context, reward);
        }

        info!(
            subject = %report.subject_id,
            reward,
            persisted,
            "outcome recorded"
        );
        RecordedOutcome {
            record_id: record.record_id,
            reward,
            persisted,
        }
    }

    /// Run one policy-adaptation cycle.
    pub fn adapt(&self) -> Result<AdaptationReport> {
        let Some(outcomes) = &self.outcomes else {
            return Err(SiftError::PersistenceUnavailable(
                "outcome store unavailable, adaptation will retry next trigger".to_string(),
            ));
        };
        let mut adapter = PolicyAdapter::new(self.adapter_cfg, outcomes, &self.policies);
        adapter.run()
    }

    /// Persist both bandit snapshots. Called at the end of a cycle.
    pub fn persist(&self) -> Result<()> {
        self.bandit_store.save_beta(&self.beta.read().snapshot())?;
        self.bandit_store
            .save_linucb(&self.linucb.read().snapshot())?;
        Ok(())
    }

    #[must_use]
    pub fn beta_summary(&self) -> Vec<ArmSummary> {
        self.beta
            .read()
            .arms()
            .iter()
            .map(|(id, posterior)| ArmSummary {
                id: id.clone(),
                alpha: posterior.alpha,
                beta: posterior.beta,
                mean: posterior.mean(),
            })
            .collect()
    }

    #[must_use]
    pub fn linucb_arm_count(&self) -> usize {
        self.linucb.read().len()
    }

    #[must_use]
    pub fn outcome_count(&self) -> u64 {
        match &self.outcomes {
            Some(store) => store.count().unwrap_or(0),
            None => 0,
        }
    }

    fn project_features(&self, record: &RewardRecord) -> Vec<f64> {
        self.feature_order
            .iter()
            .map(|name| record.context_features.get(name).copied().unwrap_or(0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::OutcomeType;
    use tempfile::tempdir;

    fn engine(root: &Path) -> SelectionEngine {
        SelectionEngine::open(root, &Config::default()).unwrap()
    }

    fn pool(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new(format!("d-{i}"), 0.5))
            .collect()
    }

    #[test]
    fn second_opener_is_locked_out() {
        let dir = tempdir().unwrap();
        let _first = engine(dir.path());
        let second = SelectionEngine::open(dir.path(), &Config::default());
        assert!(matches!(second, Err(SiftError::StateLocked(_))));
    }

    #[test]
    fn select_and_record_round_trip() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());

        let (picked, path) = engine.select(&pool(8), 3, false);
        assert_eq!(picked.len(), 3);
        assert_eq!(path, SelectionPath::ThompsonFallback);

        let mut report = OutcomeReport::new(&picked[0].id, OutcomeType::Win);
        report
            .context_features
            .insert("naics_match".to_string(), 1.0);
        let recorded = engine.record_outcome(&report);
        assert!((recorded.reward - 10.0).abs() < 1e-12);
        assert!(recorded.persisted);
        assert_eq!(engine.outcome_count(), 1);
        assert_eq!(engine.linucb_arm_count(), 1);
    }

    #[test]
    fn persisted_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let subject = "d-0";
        {
            let engine = engine(dir.path());
            let report = OutcomeReport::new(subject, OutcomeType::Shortlisted);
            engine.record_outcome(&report);
            engine.persist().unwrap();
        }
        let engine = engine(dir.path());
        let summary = engine.beta_summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].id, subject);
        assert!(summary[0].alpha > 1.0);
    }

    #[test]
    fn adapt_reports_insufficient_data() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let report = engine.adapt().unwrap();
        assert_eq!(report.status, crate::policy::AdaptationStatus::NotUpdated);
    }
}
