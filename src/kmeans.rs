//! Seeded, multi-restart K-Means used as the default partition fitter.

use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix1, Ix2};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::{Result, ValidityError};

/// Enum representing the distance metric to be used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
}

/// Output of fitting one value of k.
#[derive(Clone, Debug, PartialEq)]
pub struct FitResult {
    /// Cluster label per row, in `[0, k)`
    pub labels: Array1<usize>,
    /// One row per cluster
    pub centroids: Array2<f64>,
    /// Sum of squared distances from each row to its centroid
    pub inertia: f64,
}

impl FitResult {
    pub fn k(&self) -> usize {
        self.centroids.len_of(Axis(0))
    }
}

/// Anything that can partition a dataset into `k` clusters.
///
/// Implementations must be deterministic: the same data and `k` always give
/// the same result.
pub trait PartitionFitter: Sync {
    fn fit(&self, data: ArrayView2<'_, f64>, k: usize) -> Result<FitResult>;
}

/// Standard K-Means clustering with k-means++ seeding and restarts.
#[derive(Clone, Debug)]
pub struct KMeans {
    pub seed: u64,
    pub restarts: usize,
    pub n_iters: usize,
    pub tolerance: f64,
    pub metric: DistanceMetric,
}

impl KMeans {
    /// Creates a new KMeans instance with the given seed and restart count.
    pub fn new(seed: u64, restarts: usize) -> Self {
        let defaults = EngineConfig::default();
        KMeans {
            seed,
            restarts,
            n_iters: defaults.max_iterations,
            tolerance: defaults.tolerance,
            metric: DistanceMetric::Euclidean,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        KMeans {
            seed: config.seed,
            restarts: config.restarts,
            n_iters: config.max_iterations,
            tolerance: config.tolerance,
            metric: DistanceMetric::Euclidean,
        }
    }

    /// Fits every restart and keeps the lowest inertia; earlier restarts win ties.
    pub fn fit_predict(&self, x: ArrayView2<'_, f64>, k: usize) -> Result<FitResult> {
        let n_samples = x.len_of(Axis(0));
        if k == 0 {
            return Err(ValidityError::FitFailure {
                k,
                reason: "k must be at least 1".to_string(),
            });
        }
        if k > n_samples {
            return Err(ValidityError::FitFailure {
                k,
                reason: format!("k exceeds the number of rows ({n_samples})"),
            });
        }
        if self.restarts == 0 {
            return Err(ValidityError::FitFailure {
                k,
                reason: "restarts must be at least 1".to_string(),
            });
        }

        let mut best: Option<FitResult> = None;
        for restart in 0..self.restarts {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(restart as u64));
            let candidate = self.fit_single(&x, k, &mut rng);
            if !candidate.inertia.is_finite() {
                return Err(ValidityError::FitFailure {
                    k,
                    reason: "inertia is not finite".to_string(),
                });
            }
            match &best {
                Some(b) if candidate.inertia >= b.inertia => {}
                _ => best = Some(candidate),
            }
        }

        let best = best.ok_or_else(|| ValidityError::FitFailure {
            k,
            reason: "no restart produced a result".to_string(),
        })?;
        tracing::debug!(k, inertia = best.inertia, restarts = self.restarts, "k-means fit");
        Ok(best)
    }

    /// Predicts the closest cluster each sample in X belongs to.
    pub fn predict<S1, S2>(
        &self,
        x: &ArrayBase<S1, Ix2>,
        centroids: &ArrayBase<S2, Ix2>,
    ) -> Array1<usize>
    where
        S1: Data<Elem = f64> + Sync,
        S2: Data<Elem = f64> + Sync,
    {
        self.assign_labels(x, centroids)
    }

    /// One Lloyd run from a k-means++ start.
    fn fit_single(&self, x: &ArrayView2<'_, f64>, k: usize, rng: &mut StdRng) -> FitResult {
        let n_features = x.len_of(Axis(1));
        let mut centroids = self.init_plus_plus(x, k, rng);

        for _ in 0..self.n_iters {
            // Assign labels.
            let labels = self.assign_labels(x, &centroids);

            // Compute new centroids.
            let mut new_centroids = Array2::<f64>::zeros((k, n_features));
            let mut counts = vec![0usize; k];
            x.axis_iter(Axis(0))
                .zip(labels.iter())
                .for_each(|(row, &label)| {
                    new_centroids
                        .row_mut(label)
                        .zip_mut_with(&row, |a, &b| *a += b);
                    counts[label] += 1;
                });
            new_centroids
                .axis_iter_mut(Axis(0))
                .enumerate()
                .for_each(|(i, mut c)| {
                    if counts[i] > 0 {
                        c.mapv_inplace(|v| v / counts[i] as f64);
                    }
                });
            self.reseed_empty(x, &labels, &centroids, &counts, &mut new_centroids);

            let shift: f64 = centroids
                .axis_iter(Axis(0))
                .zip(new_centroids.axis_iter(Axis(0)))
                .map(|(old, new)| self.compute_distance(&old, &new))
                .sum();
            centroids = new_centroids;
            if shift <= self.tolerance {
                break;
            }
        }

        let labels = self.assign_labels(x, &centroids);
        let inertia: f64 = x
            .axis_iter(Axis(0))
            .zip(labels.iter())
            .map(|(row, &label)| self.compute_distance(&row, &centroids.row(label)))
            .sum();

        FitResult {
            labels,
            centroids,
            inertia,
        }
    }

    /// k-means++ seeding: each next centroid is drawn with probability
    /// proportional to its squared distance from the nearest chosen one.
    fn init_plus_plus(&self, x: &ArrayView2<'_, f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
        let n_samples = x.len_of(Axis(0));
        let n_features = x.len_of(Axis(1));
        let mut centroids = Array2::<f64>::zeros((k, n_features));

        let first = rng.gen_range(0..n_samples);
        centroids.row_mut(0).assign(&x.row(first));
        let mut closest: Vec<f64> = x
            .axis_iter(Axis(0))
            .map(|row| self.compute_distance(&row, &centroids.row(0)))
            .collect();

        for c in 1..k {
            let total: f64 = closest.iter().sum();
            let chosen = if total > 0.0 {
                let threshold = rng.gen::<f64>() * total;
                let mut cumsum = 0.0;
                let mut selected = n_samples - 1;
                for (i, &d) in closest.iter().enumerate() {
                    cumsum += d;
                    if cumsum >= threshold && d > 0.0 {
                        selected = i;
                        break;
                    }
                }
                selected
            } else {
                // Every row already sits on a centroid.
                rng.gen_range(0..n_samples)
            };

            centroids.row_mut(c).assign(&x.row(chosen));
            for (i, row) in x.axis_iter(Axis(0)).enumerate() {
                let d = self.compute_distance(&row, &centroids.row(c));
                if d < closest[i] {
                    closest[i] = d;
                }
            }
        }

        centroids
    }

    /// Moves each empty cluster onto the row farthest from its own centroid.
    fn reseed_empty(
        &self,
        x: &ArrayView2<'_, f64>,
        labels: &Array1<usize>,
        centroids: &Array2<f64>,
        counts: &[usize],
        new_centroids: &mut Array2<f64>,
    ) {
        let empty: Vec<usize> = (0..counts.len()).filter(|&i| counts[i] == 0).collect();
        if empty.is_empty() {
            return;
        }

        let mut distances: Vec<(usize, f64)> = x
            .axis_iter(Axis(0))
            .zip(labels.iter())
            .enumerate()
            .map(|(i, (row, &label))| (i, self.compute_distance(&row, &centroids.row(label))))
            .collect();
        // Stable sort keeps the lowest row index first among equal distances.
        distances.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (cluster, (row, _)) in empty.into_iter().zip(distances) {
            new_centroids.row_mut(cluster).assign(&x.row(row));
        }
    }

    /// Assigns labels to each sample based on the closest centroid.
    fn assign_labels<S1, S2>(
        &self,
        x: &ArrayBase<S1, Ix2>,
        centroids: &ArrayBase<S2, Ix2>,
    ) -> Array1<usize>
    where
        S1: Data<Elem = f64> + Sync,
        S2: Data<Elem = f64> + Sync,
    {
        let n_samples = x.len_of(Axis(0));
        let n_centroids = centroids.len_of(Axis(0));
        let labels: Vec<usize> = (0..n_samples)
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut min_dist = f64::INFINITY;
                let mut min_j = 0;
                for j in 0..n_centroids {
                    let c = centroids.row(j);
                    let dist = self.compute_distance(&row, &c);
                    if dist < min_dist {
                        min_dist = dist;
                        min_j = j;
                    }
                }
                min_j
            })
            .collect();

        Array1::from(labels)
    }

    /// Computes the squared distance between two points under the selected metric.
    fn compute_distance<S1, S2>(&self, x: &ArrayBase<S1, Ix1>, y: &ArrayBase<S2, Ix1>) -> f64
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>,
    {
        match self.metric {
            DistanceMetric::Euclidean => x
                .iter()
                .zip(y.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum(),
        }
    }
}

impl PartitionFitter for KMeans {
    fn fit(&self, data: ArrayView2<'_, f64>, k: usize) -> Result<FitResult> {
        self.fit_predict(data, k)
    }
}
