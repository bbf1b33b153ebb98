//! Render-agnostic figure plans.
//!
//! A plan says what to draw and where: subplot positions, traces, reference
//! lines and titles. Turning a plan into pixels is left to whatever charting
//! front-end consumes the serialized JSON.

use ndarray::Axis;
use serde::Serialize;

use crate::dataset::NormalizedDataset;
use crate::engine::{OptimalKResult, ValidityEngine};
use crate::error::{diagnosed, Result, ValidityError};
use crate::kmeans::{FitResult, PartitionFitter};
use crate::layout::{scatter_grid_shape, validity_chart_layout, FigureLayout, GridShape};

pub const MARKER_COLOR: &str = "darkblue";
pub const MARKER_SIZE: u32 = 10;
pub const SUBPLOT_SPACING: f64 = 0.12;
/// Edge length of one scatter panel.
pub const PANEL_SIZE: u32 = 500;
/// Edge length of the 3-D scatter figure.
pub const SCENE_SIZE: u32 = 900;

pub const POINT_MARKER_SIZE: f64 = 10.0;
pub const CENTROID_MARKER_SIZE: f64 = 50.0;
pub const SCENE_POINT_MARKER_SIZE: f64 = 7.0;
pub const SCENE_CENTROID_MARKER_SIZE: f64 = 42.0;
pub const CENTROID_OPACITY: f64 = 0.4;

const X_AXIS_TITLE: &str = "Number of K-Clusters";
const Y_AXIS_TITLE: &str = "Score";
const HOVER_TEMPLATE: &str =
    "Number of K-Clusters: <b>%{x}</b><br>Score: <b>%{y}</b><br><extra></extra>";

/// One validity-index chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSubplot {
    pub title: String,
    /// 1-based
    pub row: usize,
    /// 1-based
    pub column: usize,
    pub points: Vec<(usize, f64)>,
    pub line_color: String,
    pub marker_color: &'static str,
    pub marker_size: u32,
    pub hover_template: &'static str,
    /// Dashed vertical line drawn at the selected k
    pub reference_k: usize,
    pub x_axis_title: Option<&'static str>,
    pub y_axis_title: Option<&'static str>,
}

/// Up to four validity-index charts in one figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidityFigure {
    pub title: String,
    pub layout: FigureLayout,
    pub spacing: f64,
    pub subplots: Vec<ScoreSubplot>,
}

impl ValidityFigure {
    /// Plans one chart per result, filling the layout grid row by row. Line
    /// colors cycle when there are fewer colors than results.
    pub fn plan(results: &[OptimalKResult], line_colors: &[&str], title: &str) -> Result<Self> {
        diagnosed("validity_figure", module_path!(), || {
            let layout = validity_chart_layout(results)?;
            if line_colors.is_empty() {
                return Err(ValidityError::InvalidInput(
                    "at least one line color is required".to_string(),
                ));
            }

            let subplots = results
                .iter()
                .enumerate()
                .map(|(index, result)| {
                    let row = index / layout.columns + 1;
                    let column = index % layout.columns + 1;
                    ScoreSubplot {
                        title: result.scores.name().to_string(),
                        row,
                        column,
                        points: result.scores.entries().to_vec(),
                        line_color: line_colors[index % line_colors.len()].to_string(),
                        marker_color: MARKER_COLOR,
                        marker_size: MARKER_SIZE,
                        hover_template: HOVER_TEMPLATE,
                        reference_k: result.k,
                        x_axis_title: (row == layout.rows).then_some(X_AXIS_TITLE),
                        y_axis_title: (column == 1).then_some(Y_AXIS_TITLE),
                    }
                })
                .collect();

            Ok(Self {
                title: title.to_string(),
                layout,
                spacing: SUBPLOT_SPACING,
                subplots,
            })
        })
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: usize,
    pub row_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentroidMarker {
    pub x: f64,
    pub y: f64,
    /// 1-based cluster number shown on the marker
    pub text: String,
}

/// One k-cluster scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPanel {
    pub title: String,
    pub k: usize,
    pub row: usize,
    pub column: usize,
    pub points: Vec<ScatterPoint>,
    pub centroids: Vec<CentroidMarker>,
    /// Set on the bottom row only
    pub x_axis_title: Option<String>,
    /// Set on the first column only
    pub y_axis_title: Option<String>,
}

/// A grid of k-cluster scatter plots over two feature columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterFigure {
    pub title: String,
    pub height: u32,
    pub width: u32,
    pub grid: GridShape,
    pub x_column: String,
    pub y_column: String,
    /// Colorscale shared by point labels and centroid markers
    pub colors: Vec<String>,
    pub point_size: f64,
    pub centroid_size: f64,
    pub centroid_opacity: f64,
    pub spacing: f64,
    pub panels: Vec<ScatterPanel>,
}

impl ScatterFigure {
    /// Fits each k afresh and projects rows and centroids onto `x_column` and
    /// `y_column`. Panels fill the grid row by row.
    pub fn plan<F: PartitionFitter>(
        engine: &ValidityEngine<F>,
        data: &NormalizedDataset,
        ks: &[usize],
        colors: &[&str],
        x_column: &str,
        y_column: &str,
        title: &str,
    ) -> Result<Self> {
        diagnosed("scatter_figure", module_path!(), || {
            let grid = scatter_grid_shape(ks)?;
            let colors = colorscale(colors)?;
            let xi = data.column_index(x_column)?;
            let yi = data.column_index(y_column)?;
            let values = data.view();

            let mut panels = Vec::with_capacity(ks.len());
            for (index, &k) in ks.iter().enumerate() {
                let fit = engine.fitter().fit(values, k)?;
                let points = values
                    .axis_iter(Axis(0))
                    .zip(fit.labels.iter())
                    .zip(data.row_ids())
                    .map(|((row, &label), id)| ScatterPoint {
                        x: row[xi],
                        y: row[yi],
                        label,
                        row_id: id.clone(),
                    })
                    .collect();
                let centroids = fit
                    .centroids
                    .axis_iter(Axis(0))
                    .enumerate()
                    .map(|(n, c)| CentroidMarker {
                        x: c[xi],
                        y: c[yi],
                        text: (n + 1).to_string(),
                    })
                    .collect();

                let row = index / grid.columns + 1;
                let column = index % grid.columns + 1;
                panels.push(ScatterPanel {
                    title: format!("K-Clusters for K = {k}"),
                    k,
                    row,
                    column,
                    points,
                    centroids,
                    x_axis_title: (row == grid.rows).then(|| axis_title(x_column)),
                    y_axis_title: (column == 1).then(|| axis_title(y_column)),
                });
            }

            Ok(Self {
                title: title.to_string(),
                height: PANEL_SIZE * grid.rows as u32,
                width: PANEL_SIZE * grid.columns as u32,
                grid,
                x_column: x_column.to_string(),
                y_column: y_column.to_string(),
                colors,
                point_size: POINT_MARKER_SIZE,
                centroid_size: CENTROID_MARKER_SIZE,
                centroid_opacity: CENTROID_OPACITY,
                spacing: SUBPLOT_SPACING,
                panels,
            })
        })
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub label: usize,
    pub row_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneCentroid {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub text: String,
}

/// A single k-cluster scatter plot over three feature columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter3dFigure {
    pub title: String,
    pub k: usize,
    pub height: u32,
    pub width: u32,
    /// Column names, also used verbatim as the x, y and z axis titles
    pub columns: [String; 3],
    pub colors: Vec<String>,
    pub point_size: f64,
    pub centroid_size: f64,
    pub centroid_opacity: f64,
    pub points: Vec<ScenePoint>,
    pub centroids: Vec<SceneCentroid>,
}

impl Scatter3dFigure {
    pub fn plan<F: PartitionFitter>(
        engine: &ValidityEngine<F>,
        data: &NormalizedDataset,
        k: usize,
        colors: &[&str],
        columns: [&str; 3],
        title: &str,
    ) -> Result<Self> {
        diagnosed("scatter_3d_figure", module_path!(), || {
            let colors = colorscale(colors)?;
            let [xi, yi, zi] = [
                data.column_index(columns[0])?,
                data.column_index(columns[1])?,
                data.column_index(columns[2])?,
            ];
            let values = data.view();
            let FitResult {
                labels, centroids, ..
            } = engine.fitter().fit(values, k)?;

            let points = values
                .axis_iter(Axis(0))
                .zip(labels.iter())
                .zip(data.row_ids())
                .map(|((row, &label), id)| ScenePoint {
                    x: row[xi],
                    y: row[yi],
                    z: row[zi],
                    label,
                    row_id: id.clone(),
                })
                .collect();
            let centroids = centroids
                .axis_iter(Axis(0))
                .enumerate()
                .map(|(n, c)| SceneCentroid {
                    x: c[xi],
                    y: c[yi],
                    z: c[zi],
                    text: (n + 1).to_string(),
                })
                .collect();

            Ok(Self {
                title: title.to_string(),
                k,
                height: SCENE_SIZE,
                width: SCENE_SIZE,
                columns: columns.map(str::to_string),
                colors,
                point_size: SCENE_POINT_MARKER_SIZE,
                centroid_size: SCENE_CENTROID_MARKER_SIZE,
                centroid_opacity: CENTROID_OPACITY,
                points,
                centroids,
            })
        })
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }
}

fn colorscale(colors: &[&str]) -> Result<Vec<String>> {
    if colors.is_empty() {
        return Err(ValidityError::InvalidInput(
            "at least one cluster color is required".to_string(),
        ));
    }
    Ok(colors.iter().map(|c| c.to_string()).collect())
}

/// `price_change_7d` becomes `Price Change 7D`: underscores turn into spaces
/// and every letter that follows a non-letter is capitalised.
fn axis_title(column: &str) -> String {
    let mut title = String::with_capacity(column.len());
    let mut word_start = true;
    for ch in column.chars().map(|c| if c == '_' { ' ' } else { c }) {
        if ch.is_alphabetic() {
            if word_start {
                title.extend(ch.to_uppercase());
            } else {
                title.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            title.push(ch);
            word_start = true;
        }
    }
    title
}

fn to_json<T: Serialize>(figure: &T) -> Result<String> {
    serde_json::to_string_pretty(figure)
        .map_err(|e| ValidityError::InvalidInput(format!("cannot serialize figure: {e}")))
}
