//! Linear upper-confidence-bound bandit over per-arm ridge state.
//!
//! Each arm carries sufficient statistics `A` (d x d, starts as the
//! identity scaled by lambda) and `b` (d-vector, starts zero) defining a
//! linear reward estimate `theta = A^-1 b`. Scoring returns
//! `theta . x + explore_rate * sqrt(x^T A^-1 x)`.
//!
//! The inverse is cached per arm and maintained incrementally with the
//! Sherman-Morrison rank-1 formula; a degenerate denominator marks the
//! cache stale and the next score rebuilds it from `A` directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{Candidate, Selection};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinUcbConfig {
    /// Feature vector dimension. Contexts are padded or truncated to fit.
    pub dim: usize,

    /// Exploration aggressiveness multiplier on the confidence width.
    pub explore_rate: f64,

    /// Ridge regularization applied to the initial `A` diagonal.
    pub lambda: f64,
}

impl Default for LinUcbConfig {
    fn default() -> Self {
        Self {
            dim: 10,
            explore_rate: 0.8,
            lambda: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct RidgeArm {
    /// Row-major d x d design matrix.
    a: Vec<f64>,
    b: Vec<f64>,
    /// Cached inverse of `a`, row-major.
    a_inv: Vec<f64>,
    /// The cache no longer matches `a`; rebuild before the next score.
    stale_inverse: bool,
    pulls: u64,
}

impl RidgeArm {
    fn new(dim: usize, lambda: f64) -> Self {
        let lambda = if lambda.is_finite() && lambda > 0.0 {
            lambda
        } else {
            1.0
        };
        let mut a = vec![0.0; dim * dim];
        let mut a_inv = vec![0.0; dim * dim];
        for i in 0..dim {
            a[i * dim + i] = lambda;
            a_inv[i * dim + i] = 1.0 / lambda;
        }
        Self {
            a,
            b: vec![0.0; dim],
            a_inv,
            stale_inverse: false,
            pulls: 0,
        }
    }

    fn refresh_inverse(&mut self, dim: usize, lambda: f64) {
        if !self.stale_inverse {
            return;
        }
        match invert(&self.a, dim) {
            Some(inv) => self.a_inv = inv,
            // Singular design matrix: clamp back to the regularized
            // identity and keep scoring.
            None => {
                let fallback = RidgeArm::new(dim, lambda);
                self.a_inv = fallback.a_inv;
            }
        }
        self.stale_inverse = false;
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn mat_vec(m: &[f64], dim: usize, x: &[f64]) -> Vec<f64> {
    (0..dim)
        .map(|i| dot(&m[i * dim..(i + 1) * dim], x))
        .collect()
}

/// Gauss-Jordan inversion with partial pivoting. Returns `None` for a
/// singular matrix.
fn invert(m: &[f64], dim: usize) -> Option<Vec<f64>> {
    let mut work = m.to_vec();
    let mut inv = vec![0.0; dim * dim];
    for i in 0..dim {
        inv[i * dim + i] = 1.0;
    }

    for col in 0..dim {
        let pivot_row = (col..dim)
            .max_by(|&r1, &r2| {
                work[r1 * dim + col]
                    .abs()
                    .partial_cmp(&work[r2 * dim + col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
        let pivot = work[pivot_row * dim + col];
        if !pivot.is_finite() || pivot.abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for j in 0..dim {
                work.swap(col * dim + j, pivot_row * dim + j);
                inv.swap(col * dim + j, pivot_row * dim + j);
            }
        }
        for j in 0..dim {
            work[col * dim + j] /= pivot;
            inv[col * dim + j] /= pivot;
        }
        for row in 0..dim {
            if row == col {
                continue;
            }
            let factor = work[row * dim + col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..dim {
                work[row * dim + j] -= factor * work[col * dim + j];
                inv[row * dim + j] -= factor * inv[col * dim + j];
            }
        }
    }
    Some(inv)
}

#[derive(Debug)]
pub struct LinUcbBandit {
    cfg: LinUcbConfig,
    arms: BTreeMap<String, RidgeArm>,
}

/// Wire format for persisted LinUCB state. Carries `A` and `b` only;
/// the cached inverse is rebuilt on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinUcbState {
    pub d: usize,
    pub explore_rate: f64,
    pub a: BTreeMap<String, Vec<Vec<f64>>>,
    pub b: BTreeMap<String, Vec<f64>>,
}

impl LinUcbBandit {
    #[must_use]
    pub fn new(cfg: LinUcbConfig) -> Self {
        let cfg = LinUcbConfig {
            dim: cfg.dim.max(1),
            ..cfg
        };
        Self {
            cfg,
            arms: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &LinUcbConfig {
        &self.cfg
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    #[must_use]
    pub fn pulls(&self, arm_id: &str) -> u64 {
        self.arms.get(arm_id).map_or(0, |arm| arm.pulls)
    }

    /// Pad or truncate a raw context to the configured dimension,
    /// replacing non-finite entries with zero. Dimension mismatches are
    /// absorbed here, never raised.
    #[must_use]
    pub fn sanitize_context(&self, context: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; self.cfg.dim];
        for (i, slot) in x.iter_mut().enumerate() {
            let raw = context.get(i).copied().unwrap_or(0.0);
            *slot = if raw.is_finite() { raw } else { 0.0 };
        }
        x
    }

    fn ensure_arm(&mut self, arm_id: &str) -> &mut RidgeArm {
        let dim = self.cfg.dim;
        let lambda = self.cfg.lambda;
        self.arms
            .entry(arm_id.to_string())
            .or_insert_with(|| RidgeArm::new(dim, lambda))
    }

    /// UCB score for one arm under the given context.
    pub fn score(&mut self, arm_id: &str, context: &[f64]) -> f64 {
        let x = self.sanitize_context(context);
        let dim = self.cfg.dim;
        let lambda = self.cfg.lambda;
        let explore_rate = self.cfg.explore_rate;

        let arm = self.ensure_arm(arm_id);
        arm.refresh_inverse(dim, lambda);

        let theta = mat_vec(&arm.a_inv, dim, &arm.b);
        let mean = dot(&theta, &x);
        let ax = mat_vec(&arm.a_inv, dim, &x);
        let variance = dot(&x, &ax).max(0.0);
        let width = explore_rate * variance.sqrt();
        let score = mean + width;
        if score.is_finite() { score } else { 0.0 }
    }

    /// Score every candidate with its own feature vector and return the
    /// top `k` in descending score order (stable on ties).
    pub fn select_top_k(&mut self, candidates: &[Candidate], k: usize) -> Vec<Selection> {
        let mut scored: Vec<Selection> = candidates
            .iter()
            .map(|c| {
                let context = c.features.as_deref().unwrap_or(&[]);
                Selection {
                    id: c.id.clone(),
                    score: self.score(&c.id, context),
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Rank-1 update: `A += x x^T`, `b += reward * x`.
    pub fn update(&mut self, arm_id: &str, context: &[f64], reward: f64) {
        let x = self.sanitize_context(context);
        let dim = self.cfg.dim;
        let reward = if reward.is_finite() { reward } else { 0.0 };

        let arm = self.ensure_arm(arm_id);
        for i in 0..dim {
            for j in 0..dim {
                arm.a[i * dim + j] += x[i] * x[j];
            }
        }
        for (bi, xi) in arm.b.iter_mut().zip(&x) {
            *bi += reward * xi;
        }
        arm.pulls = arm.pulls.saturating_add(1);

        if arm.stale_inverse {
            return;
        }
        // Sherman-Morrison: (A + x x^T)^-1 = A^-1 - (A^-1 x x^T A^-1) / (1 + x^T A^-1 x)
        let ax = mat_vec(&arm.a_inv, dim, &x);
        let denom = 1.0 + dot(&x, &ax);
        if denom.is_finite() && denom > 1e-12 {
            for i in 0..dim {
                for j in 0..dim {
                    arm.a_inv[i * dim + j] -= (ax[i] * ax[j]) / denom;
                }
            }
        } else {
            arm.stale_inverse = true;
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> LinUcbState {
        let dim = self.cfg.dim;
        let mut a = BTreeMap::new();
        let mut b = BTreeMap::new();
        for (id, arm) in &self.arms {
            let rows: Vec<Vec<f64>> = (0..dim)
                .map(|i| arm.a[i * dim..(i + 1) * dim].to_vec())
                .collect();
            a.insert(id.clone(), rows);
            b.insert(id.clone(), arm.b.clone());
        }
        LinUcbState {
            d: dim,
            explore_rate: self.cfg.explore_rate,
            a,
            b,
        }
    }

    /// Rebuild a bandit from persisted state.
    ///
    /// Arms whose matrices do not match the stored dimension, or carry
    /// non-finite entries, are dropped and re-initialize lazily.
    #[must_use]
    pub fn from_snapshot(state: LinUcbState, lambda: f64) -> Self {
        let cfg = LinUcbConfig {
            dim: state.d.max(1),
            explore_rate: state.explore_rate,
            lambda,
        };
        let dim = cfg.dim;
        let mut bandit = Self::new(cfg);
        for (id, rows) in &state.a {
            let Some(b) = state.b.get(id) else { continue };
            if rows.len() != dim || b.len() != dim || rows.iter().any(|r| r.len() != dim) {
                continue;
            }
            let a: Vec<f64> = rows.iter().flatten().copied().collect();
            if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
                continue;
            }
            let mut arm = RidgeArm::new(dim, lambda);
            arm.a = a;
            arm.b = b.clone();
            arm.stale_inverse = true;
            arm.refresh_inverse(dim, lambda);
            bandit.arms.insert(id.clone(), arm);
        }
        bandit
    }

    /// Direct `A^-1` for one arm, bypassing the cache. Test support for
    /// asserting the incremental inverse stays exact.
    #[doc(hidden)]
    #[must_use]
    pub fn direct_inverse(&self, arm_id: &str) -> Option<Vec<f64>> {
        let arm = self.arms.get(arm_id)?;
        invert(&arm.a, self.cfg.dim)
    }

    #[doc(hidden)]
    #[must_use]
    pub fn cached_inverse(&self, arm_id: &str) -> Option<&[f64]> {
        self.arms.get(arm_id).map(|arm| arm.a_inv.as_slice())
    }
}
