//! CSV readers for result files and the JSON payloads built from them.
//!
//! Result files are comma separated with a header row. Columns are matched
//! by name and unknown columns are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use indexmap::IndexMap;
use ppm_core::error::CoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Row of a classification detailed file.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelRow {
    pub actual: String,
    pub predicted: String,
}

/// Row of a regression detailed file.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueRow {
    pub actual: f64,
    pub predicted: f64,
}

/// Row of a validation file.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationRow {
    pub metric: String,
    pub nr_events: f64,
    pub score: f64,
}

/// Row of a feature-importance file.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureRow {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Serialize)]
struct Point {
    x: f64,
    y: f64,
}

/// Read every row of a result file.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| csv_error(path, e))
}

fn csv_error(path: &Path, e: csv::Error) -> CoreError {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return match io.kind() {
                std::io::ErrorKind::NotFound => CoreError::not_found(path),
                _ => CoreError::Io(io),
            };
        }
        return CoreError::Validation(format!("Unreadable result file {}", path.display()));
    }
    CoreError::Validation(format!("Malformed result file {}: {e}", path.display()))
}

/// `[{"x": actual, "y": predicted}, ...]`
pub fn scatter_payload(rows: &[ValueRow]) -> Result<String, CoreError> {
    let points: Vec<Point> = rows
        .iter()
        .map(|row| Point {
            x: row.actual,
            y: row.predicted,
        })
        .collect();
    Ok(serde_json::to_string(&points)?)
}

/// Confusion matrix cells plus the label axes.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatMapData {
    /// `[[x_index, y_index, count], ...]`, ordered by x then y.
    pub payload: String,
    pub x_labels: String,
    pub y_labels: String,
}

/// Build the confusion matrix of actual (x) vs predicted (y) labels.
///
/// Both axes share the sorted union of labels so the matrix is square.
pub fn heat_map_payload(rows: &[LabelRow]) -> Result<HeatMapData, CoreError> {
    let labels: Vec<&str> = rows
        .iter()
        .flat_map(|row| [row.actual.as_str(), row.predicted.as_str()])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index_of = |label: &str| labels.binary_search(&label).unwrap_or_default();

    let mut counts: BTreeMap<(usize, usize), u64> = BTreeMap::new();
    for row in rows {
        *counts
            .entry((index_of(&row.actual), index_of(&row.predicted)))
            .or_default() += 1;
    }
    let cells: Vec<[u64; 3]> = counts
        .into_iter()
        .map(|((x, y), count)| [x as u64, y as u64, count])
        .collect();

    let axis = serde_json::to_string(&labels)?;
    Ok(HeatMapData {
        payload: serde_json::to_string(&cells)?,
        x_labels: axis.clone(),
        y_labels: axis,
    })
}

/// One validation series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: String,
    pub payload: String,
    pub final_step: i64,
}

/// Group validation rows by metric in first-seen order.
pub fn line_series(rows: &[ValidationRow]) -> Result<Vec<Series>, CoreError> {
    let mut groups: IndexMap<&str, Vec<&ValidationRow>> = IndexMap::new();
    for row in rows {
        groups.entry(row.metric.as_str()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(metric, rows)| {
            let points: Vec<Point> = rows
                .iter()
                .map(|row| Point {
                    x: row.nr_events,
                    y: row.score,
                })
                .collect();
            let final_step = rows
                .iter()
                .map(|row| row.nr_events)
                .fold(f64::MIN, f64::max) as i64;
            Ok(Series {
                metric: metric.to_string(),
                payload: serde_json::to_string(&points)?,
                final_step,
            })
        })
        .collect()
}

/// Importance values and their feature labels, as two JSON arrays.
pub fn bar_payload(rows: &[FeatureRow]) -> Result<(String, String), CoreError> {
    let values: Vec<f64> = rows.iter().map(|row| row.importance).collect();
    let labels: Vec<&str> = rows.iter().map(|row| row.feature.as_str()).collect();
    Ok((serde_json::to_string(&values)?, serde_json::to_string(&labels)?))
}
