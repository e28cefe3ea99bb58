use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bandit: BanditSection,
    #[serde(default)]
    pub adapter: AdapterSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditSection {
    /// Seed for the Thompson-sampling RNG; fixed seed means
    /// reproducible daily selections.
    pub seed: u64,

    /// LinUCB feature dimension.
    pub dim: usize,

    /// LinUCB confidence-width multiplier.
    pub explore_rate: f64,

    /// Ridge regularization on the initial design matrix.
    pub lambda: f64,
}

impl Default for BanditSection {
    fn default() -> Self {
        Self {
            seed: 17,
            dim: 10,
            explore_rate: 0.8,
            lambda: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSection {
    pub learning_rate: f64,
    pub max_records: usize,
    pub min_records: usize,
}

impl Default for AdapterSection {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            max_records: 200,
            min_records: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigPatch {
    bandit: Option<BanditPatch>,
    adapter: Option<AdapterPatch>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct BanditPatch {
    seed: Option<u64>,
    dim: Option<usize>,
    explore_rate: Option<f64>,
    lambda: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct AdapterPatch {
    learning_rate: Option<f64>,
    max_records: Option<usize>,
    min_records: Option<usize>,
}

impl Config {
    /// Load configuration: defaults, overlaid by an explicit file (or
    /// `SIFT_CONFIG`), otherwise the global then project files, then
    /// environment overrides.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SIFT_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&root.join("config.toml"))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate();

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&config_dir.join("sift/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SiftError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SiftError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.bandit {
            if let Some(seed) = patch.seed {
                self.bandit.seed = seed;
            }
            if let Some(dim) = patch.dim {
                self.bandit.dim = dim;
            }
            if let Some(explore_rate) = patch.explore_rate {
                self.bandit.explore_rate = explore_rate;
            }
            if let Some(lambda) = patch.lambda {
                self.bandit.lambda = lambda;
            }
        }
        if let Some(patch) = patch.adapter {
            if let Some(learning_rate) = patch.learning_rate {
                self.adapter.learning_rate = learning_rate;
            }
            if let Some(max_records) = patch.max_records {
                self.adapter.max_records = max_records;
            }
            if let Some(min_records) = patch.min_records {
                self.adapter.min_records = min_records;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var("SIFT_SEED") {
            self.bandit.seed = raw
                .parse()
                .map_err(|_| SiftError::Config(format!("SIFT_SEED: invalid integer '{raw}'")))?;
        }
        if let Ok(raw) = std::env::var("SIFT_EXPLORE_RATE") {
            self.bandit.explore_rate = raw.parse().map_err(|_| {
                SiftError::Config(format!("SIFT_EXPLORE_RATE: invalid float '{raw}'"))
            })?;
        }
        if let Ok(raw) = std::env::var("SIFT_LEARNING_RATE") {
            self.adapter.learning_rate = raw.parse().map_err(|_| {
                SiftError::Config(format!("SIFT_LEARNING_RATE: invalid float '{raw}'"))
            })?;
        }
        Ok(())
    }

    /// Clamp tunables into workable ranges rather than erroring; the
    /// selection job must start even under a sloppy config.
    fn validate(&mut self) {
        self.bandit.dim = self.bandit.dim.clamp(1, 256);
        if !self.bandit.explore_rate.is_finite() || self.bandit.explore_rate < 0.0 {
            self.bandit.explore_rate = BanditSection::default().explore_rate;
        }
        if !self.bandit.lambda.is_finite() || self.bandit.lambda <= 0.0 {
            self.bandit.lambda = BanditSection::default().lambda;
        }
        if !self.adapter.learning_rate.is_finite() || self.adapter.learning_rate <= 0.0 {
            self.adapter.learning_rate = AdapterSection::default().learning_rate;
        }
        self.adapter.min_records = self.adapter.min_records.max(1);
        self.adapter.max_records = self.adapter.max_records.max(self.adapter.min_records);
    }
}
