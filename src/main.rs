use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ndarray::{Array2, Axis};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use kvalidity::{
    EngineConfig, NormalizedDataset, OptimalKResult, Scatter3dFigure, ScatterFigure,
    ValidityEngine, ValidityError, ValidityFigure,
};

const LINE_COLORS: [&str; 4] = ["blue", "red", "green", "purple"];
const CLUSTER_COLORS: [&str; 5] = ["#440154", "#3b528b", "#21918c", "#5ec962", "#fde725"];

/// Generate clustered data and report the optimal number of clusters.
#[derive(Parser, Debug)]
#[command(name = "kvalidity", version)]
struct Args {
    /// Number of data points
    #[arg(long, default_value_t = 300)]
    samples: usize,

    /// Number of dimensions
    #[arg(long, default_value_t = 4)]
    features: usize,

    /// Number of generated blobs
    #[arg(long, default_value_t = 4)]
    clusters: usize,

    /// Seed for data generation and fitting
    #[arg(long)]
    seed: Option<u64>,

    /// K-means restarts per fit
    #[arg(long)]
    restarts: Option<usize>,

    /// JSON engine configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fit candidate ks in parallel
    #[arg(long)]
    parallel: bool,
}

#[derive(Serialize)]
struct MethodOutcome {
    method: &'static str,
    k: Option<usize>,
    error: Option<String>,
}

#[derive(Serialize)]
struct Summary {
    config: EngineConfig,
    methods: Vec<MethodOutcome>,
    assignment_counts: Vec<Vec<usize>>,
    validity_figure: Option<ValidityFigure>,
    scatter_figure: Option<ScatterFigure>,
    scatter_3d_figure: Option<Scatter3dFigure>,
}

/// Gaussian blobs around centres drawn from a wide normal distribution.
fn generate_blobs(
    n_samples: usize,
    n_features: usize,
    n_clusters: usize,
    rng: &mut StdRng,
) -> Result<Array2<f64>, ValidityError> {
    let bad_param = |e: rand_distr::NormalError| ValidityError::InvalidInput(e.to_string());
    let center_distribution = Normal::new(50.0, 10.0).map_err(bad_param)?;
    let point_distribution = Normal::new(0.0, 2.0).map_err(bad_param)?;

    let centers = Array2::random_using((n_clusters, n_features), center_distribution, rng);
    let assignment = Uniform::new(0, n_clusters);
    let mut data = Array2::random_using((n_samples, n_features), point_distribution, rng);
    for mut row in data.axis_iter_mut(Axis(0)) {
        let cluster = assignment.sample(rng);
        row += &centers.row(cluster);
    }
    Ok(data)
}

/// Scales every column to `[0, 1]`.
fn min_max_normalize(mut data: Array2<f64>) -> Array2<f64> {
    for mut column in data.axis_iter_mut(Axis(1)) {
        let min = column.fold(f64::INFINITY, |a, &b| a.min(b));
        let max = column.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let span = max - min;
        if span > 0.0 {
            column.mapv_inplace(|v| (v - min) / span);
        } else {
            column.fill(0.0);
        }
    }
    data
}

fn run(args: Args) -> Result<Summary, ValidityError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(restarts) = args.restarts {
        config = config.with_restarts(restarts);
    }
    if args.parallel {
        config = config.with_parallel_fits(true);
    }
    if args.clusters == 0 || args.features == 0 {
        return Err(ValidityError::InvalidInput(
            "clusters and features must be at least 1".to_string(),
        ));
    }

    tracing::info!(
        samples = args.samples,
        features = args.features,
        clusters = args.clusters,
        "generating dataset"
    );
    let mut rng = StdRng::seed_from_u64(config.seed);
    let raw = generate_blobs(args.samples, args.features, args.clusters, &mut rng)?;
    let data = NormalizedDataset::from_array(min_max_normalize(raw))?;

    let engine = ValidityEngine::new(config.clone())?;
    let report = engine.report(&data);

    let methods = report
        .outcomes
        .iter()
        .map(|(method, outcome)| MethodOutcome {
            method: method.name(),
            k: outcome.as_ref().ok().map(|r| r.k),
            error: outcome.as_ref().err().map(ToString::to_string),
        })
        .collect();

    let selected = report.selected_ks();
    let assignments = engine.cluster_assignments(&data, &selected)?;
    let assignment_counts = assignments
        .iter()
        .zip(&selected)
        .map(|(labels, &k)| {
            let mut counts = vec![0; k];
            labels.iter().for_each(|&l| counts[l] += 1);
            counts
        })
        .collect();

    let results: Vec<OptimalKResult> = report.successes().cloned().collect();
    // Chart plans are best effort: a failed plan is logged and left out.
    let validity_figure =
        ValidityFigure::plan(&results, &LINE_COLORS, "Optimal K by Validity Index").ok();
    let scatter_figure = match data.columns() {
        [x, y, ..] => ScatterFigure::plan(
            &engine,
            &data,
            &selected,
            &CLUSTER_COLORS,
            x,
            y,
            "K-Clusters",
        )
        .ok(),
        _ => None,
    };
    let scatter_3d_figure = match (data.columns(), selected.first()) {
        ([x, y, z, ..], Some(&k)) => Scatter3dFigure::plan(
            &engine,
            &data,
            k,
            &CLUSTER_COLORS,
            [x.as_str(), y.as_str(), z.as_str()],
            "K-Clusters in 3-D",
        )
        .ok(),
        _ => None,
    };

    Ok(Summary {
        config,
        methods,
        assignment_counts,
        validity_figure,
        scatter_figure,
        scatter_3d_figure,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).and_then(|summary| {
        serde_json::to_string_pretty(&summary)
            .map_err(|e| ValidityError::InvalidInput(format!("cannot serialize summary: {e}")))
    }) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "kvalidity failed");
            ExitCode::FAILURE
        }
    }
}
