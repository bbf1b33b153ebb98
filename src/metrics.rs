//! Internal cluster-validity indices: dispersion ratio, silhouette and
//! Davies-Bouldin.
//!
//! Each function takes the data matrix and one label per row. Labels need not
//! be contiguous; they are compacted before scoring. Every index requires
//! between 2 and `n - 1` distinct labels.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{Result, ValidityError};

pub const CALINSKI_HARABASZ: &str = "calinski_harabasz_score";
pub const SILHOUETTE: &str = "silhouette_score";
pub const DAVIES_BOULDIN: &str = "davies_bouldin_score";

/// Labels rewritten to `0..n_clusters` in ascending order of the originals.
struct CompactLabels {
    labels: Vec<usize>,
    n_clusters: usize,
}

fn compact_labels(
    metric: &str,
    data: &ArrayView2<'_, f64>,
    labels: &ArrayView1<'_, usize>,
) -> Result<CompactLabels> {
    let n = data.len_of(Axis(0));
    let fail = |n_clusters: usize, reason: String| ValidityError::ScoreFailure {
        method: metric.to_string(),
        k: n_clusters,
        reason,
    };

    if labels.len() != n {
        return Err(fail(
            0,
            format!("got {} labels for {n} rows", labels.len()),
        ));
    }

    let mut index = BTreeMap::new();
    for &l in labels.iter() {
        let next = index.len();
        index.entry(l).or_insert(next);
    }
    // Re-number in sorted label order so the result does not depend on row order.
    for (i, slot) in index.values_mut().enumerate() {
        *slot = i;
    }
    let n_clusters = index.len();
    if n_clusters < 2 || n_clusters > n.saturating_sub(1) {
        return Err(fail(
            n_clusters,
            format!("number of labels is {n_clusters}; valid values are 2 to n_samples - 1 (inclusive), n_samples = {n}"),
        ));
    }

    Ok(CompactLabels {
        labels: labels.iter().map(|l| index[l]).collect(),
        n_clusters,
    })
}

fn euclidean(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn squared(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn centroids(data: &ArrayView2<'_, f64>, compact: &CompactLabels) -> (Array2<f64>, Vec<usize>) {
    let n_features = data.len_of(Axis(1));
    let mut sums = Array2::<f64>::zeros((compact.n_clusters, n_features));
    let mut counts = vec![0usize; compact.n_clusters];
    for (row, &label) in data.axis_iter(Axis(0)).zip(compact.labels.iter()) {
        sums.row_mut(label).zip_mut_with(&row, |a, &b| *a += b);
        counts[label] += 1;
    }
    for (mut c, &count) in sums.axis_iter_mut(Axis(0)).zip(counts.iter()) {
        c.mapv_inplace(|v| v / count as f64);
    }
    (sums, counts)
}

fn finite(metric: &str, n_clusters: usize, score: f64) -> Result<f64> {
    if score.is_finite() {
        Ok(score)
    } else {
        Err(ValidityError::ScoreFailure {
            method: metric.to_string(),
            k: n_clusters,
            reason: format!("score is not finite ({score})"),
        })
    }
}

/// Ratio of between-cluster to within-cluster dispersion, each normalised by
/// its degrees of freedom. Higher is better.
pub fn calinski_harabasz_score(
    data: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, usize>,
) -> Result<f64> {
    let compact = compact_labels(CALINSKI_HARABASZ, &data, &labels)?;
    let n = data.len_of(Axis(0)) as f64;
    let k = compact.n_clusters as f64;

    let mean: Array1<f64> = data
        .mean_axis(Axis(0))
        .ok_or_else(|| ValidityError::InvalidInput("dataset has no rows".to_string()))?;
    let (centers, counts) = centroids(&data, &compact);

    let between: f64 = centers
        .axis_iter(Axis(0))
        .zip(counts.iter())
        .map(|(c, &count)| count as f64 * squared(&c, &mean.view()))
        .sum();
    let within: f64 = data
        .axis_iter(Axis(0))
        .zip(compact.labels.iter())
        .map(|(row, &label)| squared(&row, &centers.row(label)))
        .sum();

    let score = if within == 0.0 {
        1.0
    } else {
        between * (n - k) / (within * (k - 1.0))
    };
    finite(CALINSKI_HARABASZ, compact.n_clusters, score)
}

/// Mean silhouette coefficient over all rows, in `[-1, 1]`. Higher is better.
///
/// A row alone in its cluster scores 0.
pub fn silhouette_score(data: ArrayView2<'_, f64>, labels: ArrayView1<'_, usize>) -> Result<f64> {
    let compact = compact_labels(SILHOUETTE, &data, &labels)?;
    let n = data.len_of(Axis(0));
    let mut sizes = vec![0usize; compact.n_clusters];
    for &l in &compact.labels {
        sizes[l] += 1;
    }

    let per_row: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = compact.labels[i];
            if sizes[own] == 1 {
                return 0.0;
            }
            let row = data.row(i);
            let mut sums = vec![0.0; compact.n_clusters];
            for (j, other) in data.axis_iter(Axis(0)).enumerate() {
                if i != j {
                    sums[compact.labels[j]] += euclidean(&row, &other);
                }
            }
            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = sums
                .iter()
                .zip(sizes.iter())
                .enumerate()
                .filter(|(c, _)| *c != own)
                .map(|(_, (s, &size))| s / size as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom == 0.0 {
                0.0
            } else {
                (b - a) / denom
            }
        })
        .collect();

    let score = per_row.iter().sum::<f64>() / n as f64;
    finite(SILHOUETTE, compact.n_clusters, score)
}

/// Average over clusters of the worst-case similarity to another cluster.
/// Lower is better; 0 is the minimum.
pub fn davies_bouldin_score(
    data: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, usize>,
) -> Result<f64> {
    let compact = compact_labels(DAVIES_BOULDIN, &data, &labels)?;
    let (centers, counts) = centroids(&data, &compact);

    let mut spread = vec![0.0; compact.n_clusters];
    for (row, &label) in data.axis_iter(Axis(0)).zip(compact.labels.iter()) {
        spread[label] += euclidean(&row, &centers.row(label));
    }
    for (s, &count) in spread.iter_mut().zip(counts.iter()) {
        *s /= count as f64;
    }

    let mut separation = Array2::<f64>::zeros((compact.n_clusters, compact.n_clusters));
    for i in 0..compact.n_clusters {
        for j in 0..compact.n_clusters {
            separation[[i, j]] = euclidean(&centers.row(i), &centers.row(j));
        }
    }

    if spread.iter().all(|&s| s == 0.0) || separation.iter().all(|&d| d == 0.0) {
        return Ok(0.0);
    }

    let worst: Vec<f64> = (0..compact.n_clusters)
        .map(|i| {
            (0..compact.n_clusters)
                .filter(|&j| separation[[i, j]] != 0.0)
                .map(|j| (spread[i] + spread[j]) / separation[[i, j]])
                .fold(0.0, f64::max)
        })
        .collect();

    let score = worst.iter().sum::<f64>() / compact.n_clusters as f64;
    finite(DAVIES_BOULDIN, compact.n_clusters, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn blobs() -> (Array2<f64>, Array1<usize>) {
        (
            array![[0.0, 0.0], [0.0, 1.0], [4.0, 0.0], [4.0, 1.0]],
            array![0, 0, 1, 1],
        )
    }

    #[test]
    fn test_calinski_harabasz_hand_computed() {
        let (x, labels) = blobs();
        // Centroids (0, .5) and (4, .5), mean (2, .5): B = 2*4 + 2*4 = 16.
        // W = 4 * 0.25 = 1.  CH = 16 * (4 - 2) / (1 * (2 - 1)) = 32.
        let score = calinski_harabasz_score(x.view(), labels.view()).unwrap();
        assert_relative_eq!(score, 32.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calinski_harabasz_zero_within_is_one() {
        let x = array![[0.0], [0.0], [3.0]];
        let labels = array![0, 0, 1];
        let score = calinski_harabasz_score(x.view(), labels.view()).unwrap();
        assert_relative_eq!(score, 1.0);
    }

    #[test]
    fn test_silhouette_hand_computed() {
        let (x, labels) = blobs();
        // a = 1, b = (4 + sqrt(17)) / 2 for every row.
        let b = (4.0 + 17f64.sqrt()) / 2.0;
        let expected = (b - 1.0) / b;
        let score = silhouette_score(x.view(), labels.view()).unwrap();
        assert_relative_eq!(score, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_silhouette_singleton_cluster_scores_zero() {
        let x = array![[0.0], [1.0], [10.0]];
        let labels = array![0, 0, 1];
        // Rows 0 and 1: a = 1, b = 10 and 9.  Row 2 is a singleton.
        let expected = ((10.0 - 1.0) / 10.0 + (9.0 - 1.0) / 9.0) / 3.0;
        let score = silhouette_score(x.view(), labels.view()).unwrap();
        assert_relative_eq!(score, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_label_values_are_compacted() {
        let (x, _) = blobs();
        let sparse = array![7, 7, 3, 3];
        let dense = array![1, 1, 0, 0];
        assert_eq!(
            silhouette_score(x.view(), sparse.view()).unwrap(),
            silhouette_score(x.view(), dense.view()).unwrap()
        );
    }

    #[test]
    fn test_davies_bouldin_hand_computed() {
        let (x, labels) = blobs();
        // Each spread is 0.5, centroid distance 4: (0.5 + 0.5) / 4.
        let score = davies_bouldin_score(x.view(), labels.view()).unwrap();
        assert_relative_eq!(score, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_single_label_rejected() {
        let (x, _) = blobs();
        let labels = array![0, 0, 0, 0];
        for result in [
            calinski_harabasz_score(x.view(), labels.view()),
            silhouette_score(x.view(), labels.view()),
            davies_bouldin_score(x.view(), labels.view()),
        ] {
            assert!(matches!(result, Err(ValidityError::ScoreFailure { k: 1, .. })));
        }
    }

    #[test]
    fn test_one_label_per_row_rejected() {
        let (x, _) = blobs();
        let labels = array![0, 1, 2, 3];
        assert!(silhouette_score(x.view(), labels.view()).is_err());
    }

    #[test]
    fn test_label_length_mismatch_rejected() {
        let (x, _) = blobs();
        let labels = array![0, 1];
        assert!(calinski_harabasz_score(x.view(), labels.view()).is_err());
    }
}
