//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidityError};

/// Seed shared by every fit unless overridden.
pub const DEFAULT_SEED: u64 = 10;
/// Independent k-means runs per fit; the lowest inertia wins.
pub const DEFAULT_RESTARTS: usize = 100;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Inclusive range of candidate cluster counts.
///
/// Always non-empty with a minimum of at least 2, since a single cluster has
/// no validity score under any of the supported indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct CandidateKRange {
    min: usize,
    max: usize,
}

#[derive(Serialize, Deserialize)]
struct RawRange {
    min: usize,
    max: usize,
}

impl TryFrom<RawRange> for CandidateKRange {
    type Error = ValidityError;

    fn try_from(raw: RawRange) -> Result<Self> {
        Self::new(raw.min, raw.max)
    }
}

impl From<CandidateKRange> for RawRange {
    fn from(range: CandidateKRange) -> Self {
        Self {
            min: range.min,
            max: range.max,
        }
    }
}

impl CandidateKRange {
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min < 2 {
            return Err(ValidityError::InvalidConfig(format!(
                "candidate k range must start at 2 or more, got {min}"
            )));
        }
        if max < min {
            return Err(ValidityError::InvalidConfig(format!(
                "candidate k range {min}..={max} is empty"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.max - self.min + 1
    }

    /// Never true; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn values(&self) -> Vec<usize> {
        (self.min..=self.max).collect()
    }
}

impl Default for CandidateKRange {
    fn default() -> Self {
        Self { min: 2, max: 10 }
    }
}

/// Configuration for the validity engine and its default k-means fitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base random seed; restart `r` uses `seed + r`
    pub seed: u64,
    /// Number of k-means restarts per fit
    pub restarts: usize,
    /// Lloyd iterations per restart
    pub max_iterations: usize,
    /// Convergence threshold on total squared centroid shift
    pub tolerance: f64,
    /// Candidate cluster counts scored by every method
    pub candidate_k: CandidateKRange,
    /// Fit candidate ks on the rayon pool instead of one after another
    pub parallel_fits: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            restarts: DEFAULT_RESTARTS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            candidate_k: CandidateKRange::default(),
            parallel_fits: false,
        }
    }
}

impl EngineConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_candidate_k(mut self, candidate_k: CandidateKRange) -> Self {
        self.candidate_k = candidate_k;
        self
    }

    pub fn with_parallel_fits(mut self, parallel_fits: bool) -> Self {
        self.parallel_fits = parallel_fits;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.restarts == 0 {
            return Err(ValidityError::InvalidConfig(
                "restarts must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ValidityError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ValidityError::InvalidConfig(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Parses a JSON document; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ValidityError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidityError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}
