//! Result-file naming convention.
//!
//! Every completed job leaves three kinds of result files behind, named
//! deterministically from the log base name and the job id:
//!
//! - detailed: `{detailed_dir}/detailed_{log}_{id}{_class|_regr}.csv`
//! - validation: `{validation_dir}/validation_{log}_{id}{_class|_regr}.csv`
//! - feature importance: `{feature_dir}/feat_importance_{log}_{id}_{n}.csv`
//!
//! Whether a job is a classification or a regression is not recorded
//! anywhere; it is inferred from which detailed file exists.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::Directories;
use crate::error::CoreError;
use crate::job::Job;

pub const DETAILED_PREFIX: &str = "detailed_";
pub const VALIDATION_PREFIX: &str = "validation_";
pub const FEATURE_IMPORTANCE_PREFIX: &str = "feat_importance_";
pub const CLASSIFICATION_SUFFIX: &str = "_class";
pub const REGRESSION_SUFFIX: &str = "_regr";
pub const RESULT_EXTENSION: &str = ".csv";

/// Highest feature-importance index considered for prefix-length bucketing.
pub const MAX_FEATURE_IMPORTANCE_INDEX: u32 = 15;

/// Kind of result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Detailed,
    Validation,
    FeatureImportance,
}

impl ResultKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ResultKind::Detailed => DETAILED_PREFIX,
            ResultKind::Validation => VALIDATION_PREFIX,
            ResultKind::FeatureImportance => FEATURE_IMPORTANCE_PREFIX,
        }
    }
}

/// Generate a result file name.
///
/// Convention: `{prefix}{log}_{id}{suffix}.csv`
///
/// - `suffix` = `_class` / `_regr` for detailed and validation files
/// - `suffix` = `_{index}` for feature-importance files
///
/// # Examples
///
/// ```
/// use ppm_core::naming::{result_file_name, ResultKind};
///
/// assert_eq!(
///     result_file_name(ResultKind::Detailed, "bpi12", "42", true, None),
///     "detailed_bpi12_42_class.csv",
/// );
/// assert_eq!(
///     result_file_name(ResultKind::Validation, "bpi12", "42", false, None),
///     "validation_bpi12_42_regr.csv",
/// );
/// assert_eq!(
///     result_file_name(ResultKind::FeatureImportance, "bpi12", "42", false, Some(3)),
///     "feat_importance_bpi12_42_3.csv",
/// );
/// ```
pub fn result_file_name(
    kind: ResultKind,
    log_name: &str,
    job_id: &str,
    classification: bool,
    index: Option<u32>,
) -> String {
    let mut name = String::from(kind.prefix());
    name.push_str(log_name);
    name.push('_');
    name.push_str(job_id);

    match kind {
        ResultKind::FeatureImportance => {
            name.push('_');
            name.push_str(&index.unwrap_or(1).to_string());
        }
        _ if classification => name.push_str(CLASSIFICATION_SUFFIX),
        _ => name.push_str(REGRESSION_SUFFIX),
    }

    name.push_str(RESULT_EXTENSION);
    name
}

/// Resolves result-file paths for jobs against the configured directories.
#[derive(Debug, Clone)]
pub struct NamingResolver {
    detailed_dir: PathBuf,
    validation_dir: PathBuf,
    feature_dir: PathBuf,
}

impl NamingResolver {
    pub fn new(dirs: &Directories) -> Self {
        Self {
            detailed_dir: dirs.detailed.clone(),
            validation_dir: dirs.validation.clone(),
            feature_dir: dirs.feature_importance.clone(),
        }
    }

    /// A job is a classification unless its regression detailed file exists.
    pub fn is_classification(&self, job: &Job) -> bool {
        let regr = result_file_name(ResultKind::Detailed, &job.log_name(), &job.id, false, None);
        !self.detailed_dir.join(regr).exists()
    }

    /// Path of the detailed (true vs predicted) file.
    ///
    /// With `safe` the path is returned whether or not it exists.
    pub fn detailed_file(&self, job: &Job, safe: bool) -> Result<PathBuf, CoreError> {
        self.classified_file(ResultKind::Detailed, &self.detailed_dir, job, safe)
    }

    /// Path of the validation file.
    pub fn validation_file(&self, job: &Job, safe: bool) -> Result<PathBuf, CoreError> {
        self.classified_file(ResultKind::Validation, &self.validation_dir, job, safe)
    }

    /// Paths of the feature-importance files, ordered by index.
    ///
    /// Prefix-length bucketing yields the contiguous run of existing indices
    /// starting at 1 (at most [`MAX_FEATURE_IMPORTANCE_INDEX`]); any other
    /// bucketing yields index 1 only, which must exist unless `safe`.
    ///
    /// With `safe`, every existing feature-importance file of the job is
    /// returned, or the index-1 path when none exist.
    pub fn feature_importance_files(&self, job: &Job, safe: bool) -> Result<Vec<PathBuf>, CoreError> {
        let log_name = job.log_name();
        let first = self.feature_path(&log_name, &job.id, 1);

        if safe {
            let existing = self.existing_feature_indices(&log_name, &job.id)?;
            if existing.is_empty() {
                return Ok(vec![first]);
            }
            return Ok(existing
                .into_iter()
                .map(|idx| self.feature_path(&log_name, &job.id, idx))
                .collect());
        }

        if !job.uses_prefix_bucketing() {
            return if first.exists() {
                Ok(vec![first])
            } else {
                Err(CoreError::not_found(first))
            };
        }

        let existing = self.existing_feature_indices(&log_name, &job.id)?;
        let contiguous = existing
            .into_iter()
            .zip(1..=MAX_FEATURE_IMPORTANCE_INDEX)
            .take_while(|(found, expected)| found == expected)
            .map(|(idx, _)| self.feature_path(&log_name, &job.id, idx))
            .collect();
        Ok(contiguous)
    }

    fn classified_file(
        &self,
        kind: ResultKind,
        dir: &Path,
        job: &Job,
        safe: bool,
    ) -> Result<PathBuf, CoreError> {
        let classification = self.is_classification(job);
        let path = dir.join(result_file_name(kind, &job.log_name(), &job.id, classification, None));
        if safe || path.exists() {
            Ok(path)
        } else {
            Err(CoreError::not_found(path))
        }
    }

    fn feature_path(&self, log_name: &str, job_id: &str, index: u32) -> PathBuf {
        self.feature_dir.join(result_file_name(
            ResultKind::FeatureImportance,
            log_name,
            job_id,
            false,
            Some(index),
        ))
    }

    /// Sorted indices of the job's feature-importance files present on disk.
    fn existing_feature_indices(&self, log_name: &str, job_id: &str) -> Result<Vec<u32>, CoreError> {
        if !self.feature_dir.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!(
            r"^{}{}_{}_(\d+){}$",
            regex::escape(FEATURE_IMPORTANCE_PREFIX),
            regex::escape(log_name),
            regex::escape(job_id),
            regex::escape(RESULT_EXTENSION),
        );
        let re = Regex::new(&pattern)
            .map_err(|e| CoreError::Validation(format!("Invalid file pattern: {e}")))?;

        let mut indices = Vec::new();
        for entry in std::fs::read_dir(&self.feature_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(idx) = re
                .captures(name)
                .and_then(|caps| caps[1].parse::<u32>().ok())
            {
                indices.push(idx);
            }
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }
}
