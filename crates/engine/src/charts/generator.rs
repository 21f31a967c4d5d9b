//! Builds the chart set of a completed job from its result files.
//!
//! Single charts (the heat map or scatter plot) degrade to a placeholder
//! named after the error when their file cannot be read. Multi charts
//! (line and bar charts) are omitted instead.

use std::sync::Arc;

use ppm_core::job::Job;
use ppm_core::naming::NamingResolver;

use super::payload::{
    bar_payload, heat_map_payload, line_series, read_rows, scatter_payload, FeatureRow, LabelRow,
    ValidationRow, ValueRow,
};
use super::{BarChart, Chart, HeatMap, LineChart, ScatterPlot, EMPTY_PAYLOAD, TRUE_VS_PREDICTED};

#[derive(Debug, Clone)]
pub struct ChartGenerator {
    naming: Arc<NamingResolver>,
}

impl ChartGenerator {
    pub fn new(naming: Arc<NamingResolver>) -> Self {
        Self { naming }
    }

    /// Every chart for `job`: the true-vs-predicted chart (heat map for
    /// classification, scatter plot for regression), then line charts, then
    /// bar charts.
    pub fn generate(&self, job: &Job) -> Vec<Chart> {
        let started = std::time::Instant::now();
        let mut charts = Vec::new();

        if self.naming.is_classification(job) {
            charts.push(Chart::HeatMap(self.heat_map(job)));
        } else {
            charts.push(Chart::Scatter(self.scatter_plot(job)));
        }
        charts.extend(self.line_charts(job).into_iter().map(Chart::Line));
        charts.extend(self.bar_charts(job).into_iter().map(Chart::Bar));

        tracing::debug!(
            job_id = %job.id,
            charts = charts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Charts generated",
        );
        charts
    }

    pub fn heat_map(&self, job: &Job) -> HeatMap {
        let result = self.naming.detailed_file(job, false).and_then(|path| {
            let rows: Vec<LabelRow> = read_rows(&path)?;
            heat_map_payload(&rows)
        });

        match result {
            Ok(data) => HeatMap {
                name: TRUE_VS_PREDICTED.into(),
                payload: data.payload,
                x_labels: data.x_labels,
                y_labels: data.y_labels,
            },
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to load heat map");
                HeatMap {
                    name: e.to_string(),
                    payload: EMPTY_PAYLOAD.into(),
                    x_labels: EMPTY_PAYLOAD.into(),
                    y_labels: EMPTY_PAYLOAD.into(),
                }
            }
        }
    }

    pub fn scatter_plot(&self, job: &Job) -> ScatterPlot {
        let result = self.naming.detailed_file(job, false).and_then(|path| {
            let rows: Vec<ValueRow> = read_rows(&path)?;
            scatter_payload(&rows)
        });

        match result {
            Ok(payload) => ScatterPlot {
                name: TRUE_VS_PREDICTED.into(),
                payload,
            },
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to load scatter plot");
                ScatterPlot {
                    name: e.to_string(),
                    payload: EMPTY_PAYLOAD.into(),
                }
            }
        }
    }

    pub fn line_charts(&self, job: &Job) -> Vec<LineChart> {
        let result = self.naming.validation_file(job, false).and_then(|path| {
            let rows: Vec<ValidationRow> = read_rows(&path)?;
            line_series(&rows)
        });

        match result {
            Ok(series) => series
                .into_iter()
                .map(|s| LineChart {
                    job_id: job.id.clone(),
                    name: s.metric,
                    payload: s.payload,
                    final_step: s.final_step,
                })
                .collect(),
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to load line charts");
                Vec::new()
            }
        }
    }

    pub fn bar_charts(&self, job: &Job) -> Vec<BarChart> {
        let files = match self.naming.feature_importance_files(job, false) {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to find feature importance files");
                return Vec::new();
            }
        };

        files
            .iter()
            .enumerate()
            .filter_map(|(idx, path)| {
                let chart = read_rows::<FeatureRow>(path)
                    .and_then(|rows| bar_payload(&rows))
                    .map(|(payload, labels)| BarChart {
                        name: (idx + 1).to_string(),
                        payload,
                        labels,
                    });
                match chart {
                    Ok(chart) => Some(chart),
                    Err(e) => {
                        tracing::warn!(
                            job_id = %job.id,
                            path = %path.display(),
                            error = %e,
                            "Skipping unreadable feature importance file",
                        );
                        None
                    }
                }
            })
            .collect()
    }
}
