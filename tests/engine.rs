//! End-to-end checks of the optimal-k engine on small synthetic datasets.

use kvalidity::{
    scatter_grid_shape, validity_chart_layout, CandidateKRange, EngineConfig, FitResult,
    NamedScoreSequence, NormalizedDataset, PartitionFitter, SelectionRule, ValidityEngine,
    ValidityError, ValidityMethod,
};
use approx::assert_relative_eq;
use ndarray::{Array1, Array2, ArrayView2};

const CENTERS: [(f64, f64); 4] = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];

/// Four tight, well-separated blobs of ten points each.
fn four_blobs() -> NormalizedDataset {
    let rows: Vec<Vec<f64>> = CENTERS
        .iter()
        .flat_map(|&(cx, cy)| {
            (0..10).map(move |j| {
                vec![
                    cx + (j % 3) as f64 * 0.05,
                    cy + (j / 3) as f64 * 0.05,
                ]
            })
        })
        .collect();
    NormalizedDataset::from_rows(&rows).unwrap()
}

fn engine() -> ValidityEngine {
    ValidityEngine::new(EngineConfig::default().with_restarts(5)).unwrap()
}

#[test]
fn test_every_reported_method_scores_two_to_ten() {
    let data = four_blobs();
    let engine = engine();
    for method in ValidityMethod::REPORTED {
        let scores = engine.score_sequence(method, &data).unwrap();
        assert_eq!(scores.name(), method.name());
        assert_eq!(scores.len(), 9);
        assert_eq!(scores.ks(), (2..=10).collect::<Vec<_>>());
    }
}

#[test]
fn test_score_based_methods_find_four_blobs() {
    let data = four_blobs();
    let engine = engine();
    assert_eq!(engine.optimal_k_calinski_harabasz(&data).unwrap().k, 4);
    assert_eq!(engine.optimal_k_silhouette(&data).unwrap().k, 4);
    assert_eq!(engine.optimal_k_davies_bouldin(&data).unwrap().k, 4);
}

#[test]
fn test_davies_bouldin_label_mirrors_silhouette_scores() {
    let data = four_blobs();
    let engine = engine();
    let silhouette = engine.optimal_k_silhouette(&data).unwrap();
    let labelled = engine.optimal_k_davies_bouldin(&data).unwrap();
    assert_eq!(labelled.scores.name(), "Davies Bouldin");
    assert_eq!(labelled.scores.scores(), silhouette.scores.scores());
}

#[test]
fn test_real_davies_bouldin_is_opt_in_and_minimised() {
    let data = four_blobs();
    let result = engine()
        .optimal_k(ValidityMethod::DaviesBouldinIndex, &data)
        .unwrap();
    assert_eq!(result.scores.name(), "Davies Bouldin Index");
    assert_eq!(result.k, 4);
    let best = result.scores.get(4).unwrap();
    assert!(result.scores.scores().iter().all(|&s| s >= best));
}

#[test]
fn test_elbow_on_four_blobs() {
    // Each blob contributes 0.04125 to the within-cluster sum of squares and
    // every merge of two blobs 10 apart adds 500.
    let result = engine().optimal_k_wcss_elbow(&four_blobs()).unwrap();
    let inertia = result.scores.scores();
    assert_relative_eq!(inertia[0], 1000.165, epsilon = 1e-6);
    assert_relative_eq!(inertia[1], 500.165, epsilon = 1e-6);
    assert_relative_eq!(inertia[2], 0.165, epsilon = 1e-6);

    // Percent-variance steps are ~50, ~50 and then well under the threshold
    // of 10, so the candidate after the four-blob fit is selected.
    assert_eq!(result.k, 5);
}

#[test]
fn test_repeated_calls_are_identical() {
    let data = four_blobs();
    let engine = engine();
    for method in ValidityMethod::REPORTED {
        let a = engine.optimal_k(method, &data);
        let b = engine.optimal_k(method, &data);
        assert_eq!(a, b);
    }
}

#[test]
fn test_parallel_fitting_matches_sequential() {
    let data = four_blobs();
    let sequential = engine();
    let parallel = ValidityEngine::new(
        EngineConfig::default()
            .with_restarts(5)
            .with_parallel_fits(true),
    )
    .unwrap();
    for method in ValidityMethod::REPORTED {
        assert_eq!(
            sequential.optimal_k(method, &data),
            parallel.optimal_k(method, &data)
        );
    }
}

#[test]
fn test_assignments_for_selected_ks() {
    let data = four_blobs();
    let engine = engine();
    let ks = [2, 3, 2];
    let labels = engine.cluster_assignments(&data, &ks).unwrap();
    assert_eq!(labels.len(), 3);
    for (vector, k) in labels.iter().zip(ks) {
        assert_eq!(vector.len(), data.n_rows());
        assert!(vector.iter().all(|&l| l < k));
    }
}

#[test]
fn test_report_feeds_layouts() {
    let data = four_blobs();
    let engine = engine();
    let report = engine.report(&data);
    let results: Vec<_> = report.successes().cloned().collect();
    let layout = validity_chart_layout(&results).unwrap();
    assert!(layout.rows * layout.columns >= results.len());

    let grid = scatter_grid_shape(&report.selected_ks()).unwrap();
    assert_eq!(grid.rows * grid.columns, report.selected_ks().len());
}

/// Fitter that reports a preset inertia curve and round-robin labels.
struct ScriptedInertia(Vec<f64>);

impl PartitionFitter for ScriptedInertia {
    fn fit(&self, data: ArrayView2<'_, f64>, k: usize) -> kvalidity::Result<FitResult> {
        Ok(FitResult {
            labels: Array1::from_iter((0..data.nrows()).map(|i| i % k)),
            centroids: Array2::zeros((k, data.ncols())),
            inertia: self.0[k - 2],
        })
    }
}

#[test]
fn test_custom_fitter_drives_elbow() {
    let data = four_blobs();
    let inertia = vec![100.0, 97.0, 94.0, 91.0, 88.0, 85.0, 82.0, 79.0, 76.0];
    let engine = ValidityEngine::with_fitter(ScriptedInertia(inertia), EngineConfig::default())
        .unwrap();
    assert_eq!(engine.optimal_k_wcss_elbow(&data).unwrap().k, 3);

    let widening = vec![1e4, 9e3, 7e3, 4e3, 1e3];
    let config = EngineConfig::default().with_candidate_k(CandidateKRange::new(2, 6).unwrap());
    let engine = ValidityEngine::with_fitter(ScriptedInertia(widening), config).unwrap();
    assert!(matches!(
        engine.optimal_k_wcss_elbow(&data),
        Err(ValidityError::SelectionFailure { .. })
    ));
}

#[test]
fn test_injected_peak_at_four() {
    let scores: Vec<(usize, f64)> = (2..=10)
        .map(|k| (k, if k == 4 { 50.0 } else { 10.0 + k as f64 }))
        .collect();
    let ch = NamedScoreSequence::new("Calinski Harabasz", scores.clone()).unwrap();
    let db = NamedScoreSequence::new("Davies Bouldin", scores).unwrap();
    assert_eq!(ValidityMethod::CalinskiHarabasz.rule().select(&ch), Ok(4));
    assert_eq!(ValidityMethod::DaviesBouldin.rule().select(&db), Ok(4));
}

#[test]
fn test_silhouette_ties_pick_lowest_k() {
    let scores = vec![
        (2, 0.40),
        (3, 0.65),
        (4, 0.50),
        (5, 0.30),
        (6, 0.65),
        (7, 0.20),
        (8, 0.10),
        (9, 0.10),
        (10, 0.05),
    ];
    let seq = NamedScoreSequence::new("Silhouette", scores).unwrap();
    assert_eq!(SelectionRule::FirstMaxScan.select(&seq), Ok(3));
}
