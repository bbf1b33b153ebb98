//! The optimal-k engine: validity methods, per-method selection and cluster
//! assignment generation.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::dataset::NormalizedDataset;
use crate::error::{diagnosed, Result};
use crate::kmeans::{KMeans, PartitionFitter};
use crate::scoring::{score_sequence, NamedScoreSequence, ScoreKind};
use crate::selection::SelectionRule;

/// A cluster-validity method: what is scored per k and how the optimal k is
/// picked from the scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidityMethod {
    /// Inertia with the percent-variance elbow rule.
    WcssElbow,
    /// Dispersion ratio, highest wins.
    CalinskiHarabasz,
    /// Mean silhouette, first k reaching the maximum wins.
    Silhouette,
    /// Reported as "Davies Bouldin" but scores the mean silhouette and takes
    /// the highest. Kept as-is so its output matches existing reports; use
    /// [`ValidityMethod::DaviesBouldinIndex`] for the real index.
    DaviesBouldin,
    /// The actual Davies-Bouldin index, lowest wins. Never part of
    /// [`ValidityMethod::REPORTED`].
    DaviesBouldinIndex,
}

impl ValidityMethod {
    /// The four methods included in a standard report, in report order.
    pub const REPORTED: [ValidityMethod; 4] = [
        ValidityMethod::WcssElbow,
        ValidityMethod::CalinskiHarabasz,
        ValidityMethod::Silhouette,
        ValidityMethod::DaviesBouldin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValidityMethod::WcssElbow => "Wcss Elbow",
            ValidityMethod::CalinskiHarabasz => "Calinski Harabasz",
            ValidityMethod::Silhouette => "Silhouette",
            ValidityMethod::DaviesBouldin => "Davies Bouldin",
            ValidityMethod::DaviesBouldinIndex => "Davies Bouldin Index",
        }
    }

    pub fn score_kind(&self) -> ScoreKind {
        match self {
            ValidityMethod::WcssElbow => ScoreKind::Inertia,
            ValidityMethod::CalinskiHarabasz => ScoreKind::CalinskiHarabasz,
            ValidityMethod::Silhouette | ValidityMethod::DaviesBouldin => ScoreKind::Silhouette,
            ValidityMethod::DaviesBouldinIndex => ScoreKind::DaviesBouldin,
        }
    }

    pub fn rule(&self) -> SelectionRule {
        match self {
            ValidityMethod::WcssElbow => SelectionRule::ElbowDelta,
            ValidityMethod::CalinskiHarabasz | ValidityMethod::DaviesBouldin => {
                SelectionRule::ArgMax
            }
            ValidityMethod::Silhouette => SelectionRule::FirstMaxScan,
            ValidityMethod::DaviesBouldinIndex => SelectionRule::ArgMin,
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            ValidityMethod::WcssElbow => "optimal_k_wcss_elbow",
            ValidityMethod::CalinskiHarabasz => "optimal_k_calinski_harabasz",
            ValidityMethod::Silhouette => "optimal_k_silhouette",
            ValidityMethod::DaviesBouldin => "optimal_k_davies_bouldin",
            ValidityMethod::DaviesBouldinIndex => "optimal_k_davies_bouldin_index",
        }
    }
}

/// The selected k together with the scores it was selected from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalKResult {
    pub k: usize,
    pub scores: NamedScoreSequence,
}

/// One independent outcome per reported method.
#[derive(Debug, Clone)]
pub struct ValidityReport {
    pub outcomes: Vec<(ValidityMethod, Result<OptimalKResult>)>,
}

impl ValidityReport {
    /// Selected k of each successful method, in method order.
    pub fn selected_ks(&self) -> Vec<usize> {
        self.successes().map(|r| r.k).collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = &OptimalKResult> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn get(&self, method: ValidityMethod) -> Option<&Result<OptimalKResult>> {
        self.outcomes
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, r)| r)
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }
}

/// Scores candidate cluster counts and generates cluster assignments.
///
/// Holds no state between calls apart from its configuration and fitter; every
/// call re-fits from scratch.
pub struct ValidityEngine<F: PartitionFitter = KMeans> {
    fitter: F,
    config: EngineConfig,
}

impl ValidityEngine<KMeans> {
    /// Engine backed by the built-in k-means fitter.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fitter: KMeans::from_config(&config),
            config,
        })
    }
}

impl<F: PartitionFitter> ValidityEngine<F> {
    /// Engine backed by a caller-supplied fitter. Only the candidate range and
    /// `parallel_fits` are read from `config`.
    pub fn with_fitter(fitter: F, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { fitter, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fitter(&self) -> &F {
        &self.fitter
    }

    /// Scores every candidate k for `method` without selecting.
    pub fn score_sequence(
        &self,
        method: ValidityMethod,
        data: &NormalizedDataset,
    ) -> Result<NamedScoreSequence> {
        data.require_rows(self.config.candidate_k.min())?;
        score_sequence(
            method.name(),
            method.score_kind(),
            &self.fitter,
            data.view(),
            self.config.candidate_k,
            self.config.parallel_fits,
        )
    }

    /// Scores every candidate k and selects the optimal one for `method`.
    pub fn optimal_k(
        &self,
        method: ValidityMethod,
        data: &NormalizedDataset,
    ) -> Result<OptimalKResult> {
        diagnosed(method.operation(), module_path!(), || {
            let scores = self.score_sequence(method, data)?;
            let k = method.rule().select(&scores)?;
            tracing::info!(method = method.name(), k, "selected optimal k");
            Ok(OptimalKResult { k, scores })
        })
    }

    pub fn optimal_k_wcss_elbow(&self, data: &NormalizedDataset) -> Result<OptimalKResult> {
        self.optimal_k(ValidityMethod::WcssElbow, data)
    }

    pub fn optimal_k_calinski_harabasz(&self, data: &NormalizedDataset) -> Result<OptimalKResult> {
        self.optimal_k(ValidityMethod::CalinskiHarabasz, data)
    }

    pub fn optimal_k_silhouette(&self, data: &NormalizedDataset) -> Result<OptimalKResult> {
        self.optimal_k(ValidityMethod::Silhouette, data)
    }

    /// See [`ValidityMethod::DaviesBouldin`] for what this actually computes.
    pub fn optimal_k_davies_bouldin(&self, data: &NormalizedDataset) -> Result<OptimalKResult> {
        self.optimal_k(ValidityMethod::DaviesBouldin, data)
    }

    /// Runs the four reported methods; each outcome is independent.
    pub fn report(&self, data: &NormalizedDataset) -> ValidityReport {
        ValidityReport {
            outcomes: ValidityMethod::REPORTED
                .iter()
                .map(|&m| (m, self.optimal_k(m, data)))
                .collect(),
        }
    }

    /// Fits each k in `ks`, in order, and returns its labels.
    ///
    /// Repeated ks are fitted again. Any failure fails the whole call.
    pub fn cluster_assignments(
        &self,
        data: &NormalizedDataset,
        ks: &[usize],
    ) -> Result<Vec<Vec<usize>>> {
        diagnosed("cluster_assignments", module_path!(), || {
            data.require_rows(2)?;
            ks.iter()
                .map(|&k| {
                    let fit = self.fitter.fit(data.view(), k)?;
                    Ok(fit.labels.to_vec())
                })
                .collect()
        })
    }
}
