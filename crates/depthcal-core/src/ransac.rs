//! Generic, model-agnostic subset-consensus RANSAC.
//!
//! Implement [`Estimator`] for a model and call [`ransac`] with the data, a
//! set of [`RansacOptions`] and a random source.
//!
//! Each iteration fits the model on a random subset holding a fixed fraction
//! of the data (not a minimal sample). The remaining points are scored by
//! their residual, min–max normalized over that remaining set, and join the
//! consensus when the normalized residual is below the threshold.
//!
//! The engine never panics on degenerate input: when no candidate is accepted
//! it returns a [`RansacResult`] with `success == false` and `model == None`.

use std::time::{Duration, Instant};

use log::debug;
use rand::prelude::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which candidate wins when two consensus sets have the same size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Adopt on `>=`: the later iteration replaces the earlier one.
    #[default]
    LastWins,
    /// Adopt on `>`: the first candidate reaching a size keeps it.
    FirstWins,
}

impl TieBreak {
    /// Whether a candidate with `candidate` consensus points replaces the
    /// current best of size `best`.
    pub fn prefers(self, candidate: usize, best: usize) -> bool {
        match self {
            TieBreak::LastWins => candidate >= best,
            TieBreak::FirstWins => candidate > best,
        }
    }
}

/// Configuration parameters for the subset-consensus engine.
#[derive(Debug, Clone)]
pub struct RansacOptions {
    /// Number of RANSAC iterations.
    pub max_iters: usize,
    /// Fraction of the data drawn as the fitting subset, in `(0, 1]`.
    pub subset_fraction: f64,
    /// Normalized residual threshold in `[0, 1]`; strict `<` comparison.
    pub normalized_threshold: f64,
    /// Tie-break rule on equal consensus sizes.
    pub tie_break: TieBreak,
    /// Optional wall-clock budget; the loop stops at the first iteration
    /// boundary past it.
    pub time_budget: Option<Duration>,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            subset_fraction: 0.3,
            normalized_threshold: 0.08,
            tie_break: TieBreak::LastWins,
            time_budget: None,
        }
    }
}

impl RansacOptions {
    /// Subset size `round(n · subset_fraction)`, capped at `n`.
    pub fn subset_size(&self, n: usize) -> usize {
        let m = (n as f64 * self.subset_fraction).round();
        if m.is_finite() && m > 0.0 {
            (m as usize).min(n)
        } else {
            0
        }
    }
}

/// Output of a RANSAC run.
///
/// Check [`success`](Self::success) before using the model.
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    /// Whether at least one candidate was adopted and published.
    pub success: bool,
    /// Last published model (if any).
    pub model: Option<M>,
    /// Indices of the best consensus set: the fitting subset first (sorted),
    /// followed by the inliers found among the remaining points.
    pub consensus: Vec<usize>,
    /// Number of iterations actually performed.
    pub iters: usize,
    /// How many times a new best candidate was adopted.
    pub adoptions: usize,
    /// Iterations whose subset fit was rejected.
    pub rejected: usize,
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            success: false,
            model: None,
            consensus: Vec::new(),
            iters: 0,
            adoptions: 0,
            rejected: 0,
        }
    }
}

/// Generic estimator for the subset-consensus engine.
pub trait Estimator {
    type Datum;
    type Model;

    /// Fit a model from a subset of data indices.
    ///
    /// Return `None` if the subset is degenerate or the fitted model is not
    /// acceptable.
    fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual of one datum under a model.
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Whether an adopted model may be published as the current result.
    ///
    /// Default: always.
    fn is_publishable(_model: &Self::Model) -> bool {
        true
    }
}

/// Min–max normalize a residual. Yields NaN when every residual is equal,
/// which never passes a `<` threshold.
fn normalize(residual: f64, min: f64, max: f64) -> f64 {
    (residual - min) / (max - min)
}

/// Run the subset-consensus loop for an [`Estimator`].
///
/// The best candidate is tracked by consensus size with the configured
/// [`TieBreak`]. Every adoption of a publishable model immediately replaces
/// the published model, so the returned model is the last one adopted.
pub fn ransac<E, R>(data: &[E::Datum], opts: &RansacOptions, rng: &mut R) -> RansacResult<E::Model>
where
    E: Estimator,
    R: Rng + ?Sized,
{
    let mut result: RansacResult<E::Model> = RansacResult::default();

    let n = data.len();
    let m = opts.subset_size(n);
    if m == 0 {
        debug!("ransac: empty subset for {n} samples, nothing to fit");
        return result;
    }

    let started = Instant::now();
    let all_indices: Vec<usize> = (0..n).collect();
    let mut in_subset = vec![false; n];
    let mut subset = Vec::<usize>::with_capacity(m);
    let mut residuals = Vec::<(usize, f64)>::with_capacity(n - m);
    let mut has_best = false;
    let mut best_size = 0usize;

    for iter in 0..opts.max_iters {
        if let Some(budget) = opts.time_budget {
            if started.elapsed() >= budget {
                debug!("ransac: time budget exhausted after {iter} iterations");
                break;
            }
        }
        result.iters = iter + 1;

        subset.clear();
        subset.extend(all_indices.as_slice().choose_multiple(rng, m).copied());
        subset.sort_unstable();

        let Some(model) = E::fit(data, &subset) else {
            result.rejected += 1;
            continue;
        };

        for &i in &subset {
            in_subset[i] = true;
        }

        residuals.clear();
        let mut min_err = f64::INFINITY;
        let mut max_err = f64::NEG_INFINITY;
        for (i, datum) in data.iter().enumerate() {
            if in_subset[i] {
                continue;
            }
            let r = E::residual(&model, datum);
            min_err = min_err.min(r);
            max_err = max_err.max(r);
            residuals.push((i, r));
        }

        for &i in &subset {
            in_subset[i] = false;
        }

        let inliers = residuals
            .iter()
            .filter(|(_, r)| normalize(*r, min_err, max_err) < opts.normalized_threshold)
            .count();
        let consensus_size = m + inliers;

        if has_best && !opts.tie_break.prefers(consensus_size, best_size) {
            continue;
        }

        has_best = true;
        best_size = consensus_size;
        result.adoptions += 1;
        result.consensus.clear();
        result.consensus.extend_from_slice(&subset);
        result.consensus.extend(
            residuals
                .iter()
                .filter(|(_, r)| normalize(*r, min_err, max_err) < opts.normalized_threshold)
                .map(|(i, _)| *i),
        );
        debug!("ransac: iteration {iter} adopted with consensus {consensus_size}/{n}");

        if E::is_publishable(&model) {
            result.success = true;
            result.model = Some(model);
        }
    }

    result
}
