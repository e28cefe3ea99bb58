//! Versioned JSON policy documents with optimistic concurrency.
//!
//! Each named policy lives in its own file, so a failure saving one
//! never blocks another. Saves check the caller's held version against
//! the stored one (read-modify-write across process boundaries) and
//! keep the previous document as a `.bak` for operator rollback.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};
use crate::policy::thresholds::ConfidenceThresholds;
use crate::policy::weights::PolicyWeights;
use crate::store::write_atomic;

pub const WEIGHTS_POLICY: &str = "scoring_weights";
pub const THRESHOLDS_POLICY: &str = "confidence_thresholds";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Document<T> {
    version: u64,
    updated_at: DateTime<Utc>,
    reason: String,
    data: T,
}

pub struct PolicyStore {
    dir: PathBuf,
}

impl PolicyStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Load a named policy. Absent documents yield the type's defaults
    /// at version zero.
    pub fn load<T>(&self, name: &str) -> Result<(T, u64)>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path(name);
        if !path.exists() {
            return Ok((T::default(), 0));
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|err| SiftError::PersistenceUnavailable(format!("{name}: {err}")))?;
        let doc: Document<T> = serde_json::from_str(&raw)?;
        Ok((doc.data, doc.version))
    }

    /// Save a named policy, rejecting stale writers.
    ///
    /// `expected_version` must match what is currently stored (zero for
    /// a document that does not exist yet). Returns the new version.
    pub fn save<T: Serialize>(
        &self,
        name: &str,
        data: &T,
        expected_version: u64,
        reason: &str,
    ) -> Result<u64> {
        let path = self.path(name);
        let stored = self.stored_version(&path)?;
        if stored != expected_version {
            return Err(SiftError::VersionConflict {
                name: name.to_string(),
                held: expected_version,
                stored,
            });
        }

        let doc = Document {
            version: stored + 1,
            updated_at: Utc::now(),
            reason: reason.to_string(),
            data,
        };
        let json = serde_json::to_string_pretty(&doc)?;
        if path.exists() {
            let backup = path.with_extension("json.bak");
            let _ = std::fs::copy(&path, backup);
        }
        write_atomic(&path, &json)?;
        Ok(doc.version)
    }

    fn stored_version(&self, path: &Path) -> Result<u64> {
        if !path.exists() {
            return Ok(0);
        }
        let raw = std::fs::read_to_string(path)?;
        let doc: Document<serde_json::Value> = serde_json::from_str(&raw)?;
        Ok(doc.version)
    }

    pub fn load_weights(&self) -> Result<(PolicyWeights, u64)> {
        self.load(WEIGHTS_POLICY)
    }

    pub fn save_weights(
        &self,
        weights: &PolicyWeights,
        expected_version: u64,
        reason: &str,
    ) -> Result<u64> {
        self.save(WEIGHTS_POLICY, weights, expected_version, reason)
    }

    pub fn load_thresholds(&self) -> Result<(ConfidenceThresholds, u64)> {
        self.load(THRESHOLDS_POLICY)
    }

    pub fn save_thresholds(
        &self,
        thresholds: &ConfidenceThresholds,
        expected_version: u64,
        reason: &str,
    ) -> Result<u64> {
        self.save(THRESHOLDS_POLICY, thresholds, expected_version, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absent_policy_yields_defaults_at_version_zero() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::open(dir.path()).unwrap();
        let (weights, version) = store.load_weights().unwrap();
        assert_eq!(version, 0);
        assert_eq!(weights, PolicyWeights::default());
    }

    #[test]
    fn save_load_round_trip_bumps_version() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::open(dir.path()).unwrap();

        let mut weights = PolicyWeights::default();
        weights.weights.insert("naics_match".to_string(), 0.30);
        let v1 = store.save_weights(&weights, 0, "initial").unwrap();
        assert_eq!(v1, 1);

        let (loaded, version) = store.load_weights().unwrap();
        assert_eq!(version, 1);
        assert!((loaded.get("naics_match").unwrap() - 0.30).abs() < 1e-12);

        let v2 = store.save_weights(&loaded, 1, "second pass").unwrap();
        assert_eq!(v2, 2);
    }

    #[test]
    fn stale_writer_is_rejected() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::open(dir.path()).unwrap();
        let weights = PolicyWeights::default();
        store.save_weights(&weights, 0, "first").unwrap();

        let err = store.save_weights(&weights, 0, "stale").unwrap_err();
        assert!(matches!(
            err,
            SiftError::VersionConflict { held: 0, stored: 1, .. }
        ));
    }

    #[test]
    fn policies_are_isolated_files() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::open(dir.path()).unwrap();
        store
            .save_weights(&PolicyWeights::default(), 0, "w")
            .unwrap();
        store
            .save_thresholds(&ConfidenceThresholds::default(), 0, "t")
            .unwrap();
        assert!(dir.path().join("scoring_weights.json").exists());
        assert!(dir.path().join("confidence_thresholds.json").exists());
    }

    #[test]
    fn save_keeps_a_backup() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::open(dir.path()).unwrap();
        store
            .save_weights(&PolicyWeights::default(), 0, "first")
            .unwrap();
        store
            .save_weights(&PolicyWeights::default(), 1, "second")
            .unwrap();
        assert!(dir.path().join("scoring_weights.json.bak").exists());
    }
}
