//! Error types for the optimal-k engine.
//!
//! Every top-level operation returns [`Result`]. A failure is terminal for that
//! call: the partial result is dropped, one diagnostic event is recorded through
//! [`record_failure`], and the error is handed back to the caller.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ValidityError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidityError {
    /// The dataset or an argument has the wrong shape or content.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The engine configuration violates an invariant.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The partition fitter could not fit `k` clusters.
    #[error("fit failed for k = {k}: {reason}")]
    FitFailure { k: usize, reason: String },

    /// A score function could not score the fit for `k`.
    #[error("{method} score failed for k = {k}: {reason}")]
    ScoreFailure {
        method: String,
        k: usize,
        reason: String,
    },

    /// No candidate satisfied the method's selection rule.
    #[error("{method}: no candidate k satisfies the selection rule")]
    SelectionFailure { method: String },

    /// A layout dispatcher has no mapping for this many plots.
    #[error("{operation}: no layout defined for {count} plot(s)")]
    UnsupportedCount { operation: &'static str, count: usize },
}

impl ValidityError {
    /// Short machine-readable tag for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidConfig(_) => "invalid_config",
            Self::FitFailure { .. } => "fit_failure",
            Self::ScoreFailure { .. } => "score_failure",
            Self::SelectionFailure { .. } => "selection_failure",
            Self::UnsupportedCount { .. } => "unsupported_count",
        }
    }
}

/// Records one diagnostic event for a failed top-level operation.
pub(crate) fn record_failure(operation: &str, source: &str, err: &ValidityError) {
    tracing::error!(
        operation,
        source,
        kind = err.kind(),
        error = %err,
        "{operation} was unable to return a result"
    );
}

/// Runs `f` and records a diagnostic if it fails.
pub(crate) fn diagnosed<T>(
    operation: &str,
    source: &str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    f().inspect_err(|e| record_failure(operation, source, e))
}
