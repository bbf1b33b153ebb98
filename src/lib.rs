//! Optimal cluster-count selection for k-means over a normalized table.
//!
//! Four validity methods score every candidate k and each picks its own
//! optimal k:
//!
//! | Method | Score per k | Rule |
//! |--------|-------------|------|
//! | Wcss Elbow | inertia | percent-variance elbow |
//! | Calinski Harabasz | dispersion ratio | highest |
//! | Silhouette | mean silhouette | first k at the maximum |
//! | Davies Bouldin | mean silhouette | highest |
//!
//! The "Davies Bouldin" row is reproduced as it has always been reported. The
//! real index is available as [`ValidityMethod::DaviesBouldinIndex`].
//!
//! ```rust,no_run
//! use kvalidity::{EngineConfig, NormalizedDataset, ValidityEngine};
//!
//! # fn main() -> kvalidity::Result<()> {
//! let data = NormalizedDataset::from_rows(&[vec![0.0, 0.1], vec![0.2, 0.0]])?;
//! let engine = ValidityEngine::new(EngineConfig::default())?;
//! let report = engine.report(&data);
//! let labels = engine.cluster_assignments(&data, &report.selected_ks())?;
//! # Ok(())
//! # }
//! ```

pub mod chart;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod kmeans;
pub mod layout;
pub mod metrics;
pub mod scoring;
pub mod selection;

pub use chart::{Scatter3dFigure, ScatterFigure, ValidityFigure};
pub use config::{CandidateKRange, EngineConfig};
pub use dataset::NormalizedDataset;
pub use engine::{OptimalKResult, ValidityEngine, ValidityMethod, ValidityReport};
pub use error::{Result, ValidityError};
pub use kmeans::{FitResult, KMeans, PartitionFitter};
pub use layout::{scatter_grid_shape, validity_chart_layout, FigureLayout, GridShape};
pub use scoring::{NamedScoreSequence, ScoreKind};
pub use selection::SelectionRule;
