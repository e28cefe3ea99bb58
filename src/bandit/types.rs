//! Shared bandit data types: candidates, selections, Beta posteriors.

use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

/// Floor applied to Beta parameters so the posterior never degenerates.
pub const PARAM_FLOOR: f64 = 0.01;

/// A rankable candidate as produced by the external scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,

    /// Heuristic fit score in [0, 1], used to seed informative priors.
    pub fit_score: f64,

    /// Optional fixed-length feature vector describing the candidate at
    /// decision time. Padded or truncated to the configured dimension on
    /// ingestion.
    #[serde(default)]
    pub features: Option<Vec<f64>>,
}

impl Candidate {
    #[must_use]
    pub fn new(id: impl Into<String>, fit_score: f64) -> Self {
        Self {
            id: id.into(),
            fit_score,
            features: None,
        }
    }

    #[must_use]
    pub fn with_features(mut self, features: Vec<f64>) -> Self {
        self.features = Some(features);
        self
    }

    #[must_use]
    pub fn has_features(&self) -> bool {
        self.features.as_ref().is_some_and(|f| !f.is_empty())
    }
}

/// One entry of an ordered selection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub id: String,

    /// The sampled value (Beta path) or UCB score (LinUCB path) that
    /// earned the candidate its position.
    pub score: f64,
}

/// Per-arm Beta posterior over win probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPosterior {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BetaPosterior {
    fn default() -> Self {
        Self::uniform()
    }
}

impl BetaPosterior {
    /// Uniform prior for arms with no history.
    #[must_use]
    pub const fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }

    /// Informative prior derived from a heuristic fit score in [0, 1].
    ///
    /// A score of 0.9 becomes Beta(9, 1), biasing early selection toward
    /// candidates the external scorer already liked.
    #[must_use]
    pub fn from_fit_score(score: f64) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.5
        };
        Self {
            alpha: (score * 10.0).max(1.0),
            beta: ((1.0 - score) * 10.0).max(1.0),
        }
    }

    fn floored(self) -> (f64, f64) {
        let clamp = |v: f64| if v.is_finite() { v.max(PARAM_FLOOR) } else { PARAM_FLOOR };
        (clamp(self.alpha), clamp(self.beta))
    }

    /// Posterior mean `alpha / (alpha + beta)`.
    #[must_use]
    pub fn mean(self) -> f64 {
        let (alpha, beta) = self.floored();
        alpha / (alpha + beta)
    }

    /// Draw one sample from the posterior.
    ///
    /// Total: if the distribution cannot be constructed from the current
    /// parameters, falls back to the posterior mean instead of failing.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        let (alpha, beta) = self.floored();
        match Beta::new(alpha, beta) {
            Ok(dist) => dist.sample(rng).clamp(0.0, 1.0),
            Err(_) => self.mean(),
        }
    }

    /// Fold one scalar reward into the posterior.
    ///
    /// Positive rewards add their magnitude to `alpha`; any non-positive
    /// reward adds exactly 1.0 to `beta`. Loss magnitude is dominated by
    /// factors outside the candidate's control, so failures count once.
    pub fn observe(&mut self, reward: f64) {
        if reward > 0.0 && reward.is_finite() {
            self.alpha += reward;
        } else {
            self.beta += 1.0;
        }
        let (alpha, beta) = self.floored();
        self.alpha = alpha;
        self.beta = beta;
    }
}
