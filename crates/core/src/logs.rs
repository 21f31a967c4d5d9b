//! User event-log catalogue and dataset descriptors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::json_file::read_json;

/// Base name of a log file: the file name without its extension.
///
/// ```
/// use ppm_core::logs::log_base_name;
///
/// assert_eq!(log_base_name("/logs/bpi_2012.csv"), "bpi_2012");
/// assert_eq!(log_base_name("sepsis.tar.xes"), "sepsis.tar");
/// ```
pub fn log_base_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// List the files in `dir` whose extension is in `extensions`, sorted by name.
///
/// Extensions are compared case-insensitively and without the leading dot.
pub fn available_logs(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, CoreError> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "User log directory does not exist");
        return Ok(Vec::new());
    }

    let mut logs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let allowed = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext));
        if allowed {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}

/// Column roles chosen by the user for a log, before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub case_id_col: String,
    pub timestamp_col: String,
    pub activity_col: String,
    /// Always folded into the dynamic categorical columns.
    #[serde(default)]
    pub resource_col: Option<String>,
    #[serde(default)]
    pub static_cat_cols: Vec<String>,
    #[serde(default)]
    pub dynamic_cat_cols: Vec<String>,
    #[serde(default)]
    pub static_num_cols: Vec<String>,
    #[serde(default)]
    pub dynamic_num_cols: Vec<String>,
    #[serde(default)]
    pub future_values: Vec<String>,
}

/// Persisted description of a log's columns, `{datasets_dir}/{log}.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub case_id_col: String,
    pub timestamp_col: String,
    pub activity_col: String,
    #[serde(default)]
    pub static_cat_cols: Vec<String>,
    #[serde(default)]
    pub dynamic_cat_cols: Vec<String>,
    #[serde(default)]
    pub static_num_cols: Vec<String>,
    #[serde(default)]
    pub dynamic_num_cols: Vec<String>,
    #[serde(default)]
    pub future_values: Vec<String>,
}

impl DatasetDescriptor {
    pub fn from_roles(roles: ColumnRoles) -> Result<Self, CoreError> {
        for (role, value) in [
            ("case_id_col", &roles.case_id_col),
            ("timestamp_col", &roles.timestamp_col),
            ("activity_col", &roles.activity_col),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{role} must be set")));
            }
        }

        let mut dynamic_cat_cols = roles.dynamic_cat_cols;
        if let Some(resource) = roles.resource_col.filter(|r| !r.is_empty()) {
            if !dynamic_cat_cols.contains(&resource) {
                dynamic_cat_cols.push(resource);
            }
        }

        Ok(Self {
            case_id_col: roles.case_id_col,
            timestamp_col: roles.timestamp_col,
            activity_col: roles.activity_col,
            static_cat_cols: roles.static_cat_cols,
            dynamic_cat_cols,
            static_num_cols: roles.static_num_cols,
            dynamic_num_cols: roles.dynamic_num_cols,
            future_values: roles.future_values,
        })
    }

    /// Columns offered as prediction targets: static categorical, static
    /// numeric and future values, minus the activity column.
    pub fn target_columns(&self) -> Vec<String> {
        self.static_cat_cols
            .iter()
            .chain(&self.static_num_cols)
            .chain(&self.future_values)
            .filter(|col| **col != self.activity_col)
            .cloned()
            .collect()
    }

    pub fn path_for(datasets_dir: &Path, log_name: &str) -> PathBuf {
        datasets_dir.join(format!("{log_name}.json"))
    }
}

/// Target columns of a log whose dataset descriptor has been generated.
pub fn read_log_columns(datasets_dir: &Path, log_name: &str) -> Result<Vec<String>, CoreError> {
    let descriptor: DatasetDescriptor = read_json(&DatasetDescriptor::path_for(datasets_dir, log_name))?;
    Ok(descriptor.target_columns())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn roles() -> ColumnRoles {
        ColumnRoles {
            case_id_col: "case".into(),
            timestamp_col: "time".into(),
            activity_col: "activity".into(),
            resource_col: Some("org:resource".into()),
            static_cat_cols: vec!["activity".into(), "diagnosis".into()],
            static_num_cols: vec!["age".into()],
            future_values: vec!["outcome".into()],
            ..Default::default()
        }
    }

    #[test]
    fn lists_only_allowed_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.XES", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let logs = available_logs(dir.path(), &["csv".into(), "xes".into()]).unwrap();
        let names: Vec<_> = logs.iter().map(|p| log_base_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_log_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let logs = available_logs(&dir.path().join("missing"), &["csv".into()]).unwrap();
        assert!(logs.is_empty());
    }

    #[test]
    fn resource_folds_into_dynamic_categorical() {
        let descriptor = DatasetDescriptor::from_roles(roles()).unwrap();
        assert_eq!(descriptor.dynamic_cat_cols, vec!["org:resource"]);
    }

    #[test]
    fn target_columns_exclude_activity() {
        let descriptor = DatasetDescriptor::from_roles(roles()).unwrap();
        assert_eq!(descriptor.target_columns(), vec!["diagnosis", "age", "outcome"]);
    }

    #[test]
    fn blank_required_role_rejected() {
        let mut roles = roles();
        roles.timestamp_col = " ".into();
        assert_matches!(DatasetDescriptor::from_roles(roles), Err(CoreError::Validation(_)));
    }

    #[test]
    fn read_columns_of_ungenerated_log_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(read_log_columns(dir.path(), "bpi"), Err(CoreError::NotFound { .. }));
    }
}
