// ------------------------------------------------------------
// Lloyd's k-means with random restarts
// ------------------------------------------------------------

use rand::Rng;
use rand::seq::index;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SegmentError};
use crate::features::FeatureMatrix;

pub const DEFAULT_CLUSTERS: usize = 2;
pub const DEFAULT_ATTEMPTS: usize = 10;
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
/// Centroid displacement, in raw channel units, below which a trial stops.
pub const DEFAULT_EPSILON: f32 = 1.0;

/// Tuning knobs for [`kmeans`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    /// Number of clusters `K`.
    pub k: usize,
    /// Independent trials; the one with the lowest inertia wins.
    pub attempts: usize,
    /// Iteration cap per trial.
    pub max_iterations: usize,
    /// Stop a trial once no centroid moves farther than this.
    pub epsilon: f32,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTERS,
            attempts: DEFAULT_ATTEMPTS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl KMeansParams {
    /// Check the parameters against a data set of `n` rows.
    pub fn validate(&self, n: usize) -> Result<()> {
        if self.k == 0 || self.k > n {
            return Err(SegmentError::parameter(
                "k",
                format!("must be in 1..={n}, got {}", self.k),
            ));
        }
        self.validate_termination()
    }

    /// The checks that do not depend on the data size.
    pub fn validate_termination(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(SegmentError::parameter("attempts", "must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(SegmentError::parameter("max_iterations", "must be at least 1"));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(SegmentError::parameter(
                "epsilon",
                format!("must be a finite non-negative number, got {}", self.epsilon),
            ));
        }
        Ok(())
    }
}

/// Result of the best k-means trial.
///
/// Cluster ids are arbitrary per call: id 0 in one run may be id 1 in the
/// next. Derive meaning from the centroids, never from the ids.
#[derive(Clone, Debug, PartialEq)]
pub struct Clustering {
    /// Cluster id for every feature row, in row order.
    pub assignment: Vec<usize>,
    pub centroids: Vec<[f32; 3]>,
    /// Sum of squared distances from each row to its centroid.
    pub inertia: f64,
    /// Iterations the winning trial ran.
    pub iterations: usize,
    /// Index of the winning trial.
    pub trial: usize,
}

impl Clustering {
    /// Number of rows assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &c in &self.assignment {
            sizes[c] += 1;
        }
        sizes
    }
}

/// Partition `features` into `params.k` clusters.
///
/// Each trial seeds its centroids with `k` distinct rows drawn uniformly from
/// `rng`, then alternates nearest-centroid assignment and mean updates until
/// the largest centroid move drops below `epsilon` or `max_iterations` is
/// reached. A centroid that loses all of its rows keeps its previous value.
pub fn kmeans<R: Rng + ?Sized>(
    features: &FeatureMatrix,
    params: &KMeansParams,
    rng: &mut R,
) -> Result<Clustering> {
    let rows = features.rows();
    if rows.is_empty() {
        return Err(SegmentError::InvalidInput(
            "cannot cluster an empty feature matrix".into(),
        ));
    }
    params.validate(rows.len())?;

    let mut best: Option<Clustering> = None;
    for trial in 0..params.attempts {
        let candidate = run_trial(rows, params, trial, rng);
        debug!(
            trial,
            iterations = candidate.iterations,
            inertia = candidate.inertia,
            "k-means trial finished"
        );
        if best.as_ref().is_none_or(|b| candidate.inertia < b.inertia) {
            best = Some(candidate);
        }
    }

    best.ok_or_else(|| SegmentError::parameter("attempts", "must be at least 1"))
}

fn run_trial<R: Rng + ?Sized>(
    rows: &[[f32; 3]],
    params: &KMeansParams,
    trial: usize,
    rng: &mut R,
) -> Clustering {
    let mut centroids: Vec<[f32; 3]> = index::sample(rng, rows.len(), params.k)
        .into_iter()
        .map(|i| rows[i])
        .collect();
    let mut assignment = vec![0usize; rows.len()];

    let mut iterations = 0;
    while iterations < params.max_iterations {
        assign(rows, &centroids, &mut assignment);
        let updated = recompute_centroids(rows, &assignment, &centroids);
        let shift = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_distance(a, b).sqrt())
            .fold(0.0f64, f64::max);

        centroids = updated;
        iterations += 1;
        if shift < f64::from(params.epsilon) {
            break;
        }
    }

    // Final pass so the labels agree with the centroids we hand back.
    let inertia = assign(rows, &centroids, &mut assignment);

    Clustering {
        assignment,
        centroids,
        inertia,
        iterations,
        trial,
    }
}

#[inline(always)]
fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Index of the closest centroid and its squared distance. Ties go to the
/// lowest index.
#[inline]
fn nearest(row: &[f32; 3], centroids: &[[f32; 3]]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, c) in centroids.iter().enumerate() {
        let d = squared_distance(row, c);
        if d < best_dist {
            best_dist = d;
            best_idx = idx;
        }
    }
    (best_idx, best_dist)
}

/// Label every row and return the resulting inertia.
///
/// The parallel path only distributes the per-row nearest search; the
/// inertia is still summed in row order so both paths agree bit for bit.
fn assign(rows: &[[f32; 3]], centroids: &[[f32; 3]], assignment: &mut [usize]) -> f64 {
    #[cfg(feature = "parallel")]
    let nearest_rows: Vec<(usize, f64)> = rows.par_iter().map(|r| nearest(r, centroids)).collect();
    #[cfg(not(feature = "parallel"))]
    let nearest_rows: Vec<(usize, f64)> = rows.iter().map(|r| nearest(r, centroids)).collect();

    let mut inertia = 0.0;
    for (slot, (idx, dist)) in assignment.iter_mut().zip(nearest_rows) {
        *slot = idx;
        inertia += dist;
    }
    inertia
}

fn recompute_centroids(
    rows: &[[f32; 3]],
    assignment: &[usize],
    previous: &[[f32; 3]],
) -> Vec<[f32; 3]> {
    let mut sums = vec![[0.0f64; 3]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (row, &c) in rows.iter().zip(assignment) {
        for (s, &v) in sums[c].iter_mut().zip(row) {
            *s += f64::from(v);
        }
        counts[c] += 1;
    }

    previous
        .iter()
        .enumerate()
        .map(|(idx, prev)| {
            if counts[idx] == 0 {
                debug!(cluster = idx, "empty cluster keeps its previous centroid");
                *prev
            } else {
                let n = counts[idx] as f64;
                sums[idx].map(|s| (s / n) as f32)
            }
        })
        .collect()
}
