//! Named score sequences and the per-k scoring strategies that produce them.

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CandidateKRange;
use crate::error::{Result, ValidityError};
use crate::kmeans::{FitResult, PartitionFitter};
use crate::metrics;

/// An ordered `k -> score` mapping tagged with the name of the method that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedScoreSequence {
    name: String,
    entries: Vec<(usize, f64)>,
}

impl NamedScoreSequence {
    /// Builds a sequence, rejecting empty input and keys that are not strictly
    /// increasing.
    pub fn new(name: impl Into<String>, entries: Vec<(usize, f64)>) -> Result<Self> {
        let name = name.into();
        if entries.is_empty() {
            return Err(ValidityError::InvalidInput(format!(
                "score sequence '{name}' is empty"
            )));
        }
        if let Some(w) = entries.windows(2).find(|w| w[0].0 >= w[1].0) {
            return Err(ValidityError::InvalidInput(format!(
                "score sequence '{name}' keys are not strictly increasing at k = {}",
                w[1].0
            )));
        }
        Ok(Self { name, entries })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn ks(&self) -> Vec<usize> {
        self.entries.iter().map(|&(k, _)| k).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.entries.iter().map(|&(_, s)| s).collect()
    }

    pub fn get(&self, k: usize) -> Option<f64> {
        self.entries
            .binary_search_by_key(&k, |&(key, _)| key)
            .ok()
            .map(|i| self.entries[i].1)
    }
}

/// What is measured for each fitted k.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreKind {
    /// The fitter's own inertia
    Inertia,
    CalinskiHarabasz,
    Silhouette,
    DaviesBouldin,
}

impl ScoreKind {
    pub fn score(&self, data: ArrayView2<'_, f64>, fit: &FitResult) -> Result<f64> {
        match self {
            ScoreKind::Inertia => Ok(fit.inertia),
            ScoreKind::CalinskiHarabasz => {
                metrics::calinski_harabasz_score(data, fit.labels.view())
            }
            ScoreKind::Silhouette => metrics::silhouette_score(data, fit.labels.view()),
            ScoreKind::DaviesBouldin => metrics::davies_bouldin_score(data, fit.labels.view()),
        }
    }
}

/// Fits every candidate k and scores each fit, producing a sequence in
/// candidate order.
///
/// With `parallel` set, candidates are fitted on the rayon pool; entries are
/// still collected by candidate position. The first failing k (in candidate
/// order) aborts the whole sequence.
pub fn score_sequence<F: PartitionFitter + ?Sized>(
    name: &str,
    kind: ScoreKind,
    fitter: &F,
    data: ArrayView2<'_, f64>,
    candidates: CandidateKRange,
    parallel: bool,
) -> Result<NamedScoreSequence> {
    let score_one = |k: usize| -> Result<(usize, f64)> {
        let fit = fitter.fit(data, k)?;
        let score = kind.score(data, &fit).map_err(|e| match e {
            ValidityError::ScoreFailure { reason, .. } => ValidityError::ScoreFailure {
                method: name.to_string(),
                k,
                reason,
            },
            other => other,
        })?;
        if !score.is_finite() {
            return Err(ValidityError::ScoreFailure {
                method: name.to_string(),
                k,
                reason: format!("score is not finite ({score})"),
            });
        }
        tracing::debug!(method = name, k, score, "scored candidate");
        Ok((k, score))
    };

    let ks = candidates.values();
    let entries = if parallel {
        ks.into_par_iter()
            .map(score_one)
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>>>()?
    } else {
        ks.into_iter().map(score_one).collect::<Result<Vec<_>>>()?
    };

    NamedScoreSequence::new(name, entries)
}
