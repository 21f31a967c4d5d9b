//! Chart payloads derived from a job's result files.
//!
//! - [`generator`] -- reads result files and builds [`Chart`]s.
//! - [`cache`] -- owner-keyed cache in front of the generator.
//! - [`payload`] -- CSV readers and JSON payload builders.

pub mod cache;
pub mod generator;
pub mod payload;

use serde::Serialize;

pub use cache::ChartCache;
pub use generator::ChartGenerator;

/// Name of the single true-vs-predicted chart.
pub const TRUE_VS_PREDICTED: &str = "true_vs_predicted";

/// Placeholder payload used by single charts that failed to load.
pub const EMPTY_PAYLOAD: &str = "{}";

/// Actual vs predicted values of a regression job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPlot {
    pub name: String,
    pub payload: String,
}

/// Confusion matrix of a classification job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatMap {
    pub name: String,
    pub payload: String,
    pub x_labels: String,
    pub y_labels: String,
}

/// Score per prefix length for one validation metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub job_id: String,
    pub name: String,
    pub payload: String,
    /// Largest prefix length in the series.
    pub final_step: i64,
}

/// Feature importance for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub name: String,
    pub payload: String,
    pub labels: String,
}

/// Any chart the generator can produce. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Scatter(ScatterPlot),
    HeatMap(HeatMap),
    Line(LineChart),
    Bar(BarChart),
}

impl Chart {
    pub fn name(&self) -> &str {
        match self {
            Chart::Scatter(c) => &c.name,
            Chart::HeatMap(c) => &c.name,
            Chart::Line(c) => &c.name,
            Chart::Bar(c) => &c.name,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            Chart::Scatter(c) => &c.payload,
            Chart::HeatMap(c) => &c.payload,
            Chart::Line(c) => &c.payload,
            Chart::Bar(c) => &c.payload,
        }
    }
}
