//! Rules that turn a named score sequence into a single optimal k.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidityError};
use crate::scoring::NamedScoreSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionRule {
    /// First k whose percent-variance step from its predecessor is below
    /// `len + 1` percentage points. See [`elbow_delta`].
    ElbowDelta,
    /// Highest score, first occurrence on ties
    ArgMax,
    /// Find the maximum, then scan for the first k scoring exactly that value
    FirstMaxScan,
    /// Lowest score, first occurrence on ties
    ArgMin,
}

impl SelectionRule {
    pub fn select(&self, scores: &NamedScoreSequence) -> Result<usize> {
        match self {
            SelectionRule::ElbowDelta => elbow_delta(scores),
            SelectionRule::ArgMax => argmax(scores),
            SelectionRule::FirstMaxScan => first_max_scan(scores),
            SelectionRule::ArgMin => argmin(scores),
        }
    }
}

fn no_selection(scores: &NamedScoreSequence) -> ValidityError {
    ValidityError::SelectionFailure {
        method: scores.name().to_string(),
    }
}

/// Percent of the first entry's inertia explained by each entry:
/// `100 * (1 - inertia[i] / inertia[0])`.
pub fn percent_variance(scores: &NamedScoreSequence) -> Vec<f64> {
    let entries = scores.entries();
    let Some(&(_, base)) = entries.first() else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|&(_, inertia)| 100.0 * (1.0 - inertia / base))
        .collect()
}

/// Elbow rule over an inertia sequence.
///
/// The threshold is the number of candidates plus one, compared against raw
/// percentage-point steps. For well-separated data this usually accepts the
/// first step, i.e. the second candidate.
pub fn elbow_delta(scores: &NamedScoreSequence) -> Result<usize> {
    let variance = percent_variance(scores);
    let threshold = (variance.len() + 1) as f64;

    (1..variance.len())
        .find(|&i| (variance[i] - variance[i - 1]).abs() < threshold)
        .map(|i| scores.entries()[i].0)
        .ok_or_else(|| no_selection(scores))
}

pub fn argmax(scores: &NamedScoreSequence) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &(k, s) in scores.entries() {
        match best {
            Some((_, b)) if s <= b || s.is_nan() => {}
            _ if s.is_nan() => {}
            _ => best = Some((k, s)),
        }
    }
    best.map(|(k, _)| k).ok_or_else(|| no_selection(scores))
}

pub fn first_max_scan(scores: &NamedScoreSequence) -> Result<usize> {
    let max = scores
        .entries()
        .iter()
        .map(|&(_, s)| s)
        .filter(|s| !s.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    scores
        .entries()
        .iter()
        .find(|&&(_, s)| s == max)
        .map(|&(k, _)| k)
        .ok_or_else(|| no_selection(scores))
}

pub fn argmin(scores: &NamedScoreSequence) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &(k, s) in scores.entries() {
        match best {
            Some((_, b)) if s >= b || s.is_nan() => {}
            _ if s.is_nan() => {}
            _ => best = Some((k, s)),
        }
    }
    best.map(|(k, _)| k).ok_or_else(|| no_selection(scores))
}
