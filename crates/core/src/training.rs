//! Persisted per-job training records.
//!
//! Each job that reaches execution leaves `{training_dir}/{job-id}.json`
//! behind. The Job Cache rebuilds completed jobs from these records and the
//! disposal sweep uses their start dates to decide what to reap.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::job::{Job, JobStatus};
use crate::json_file::{read_json, write_json_atomic};
use crate::model_params::ModelParameter;
use crate::types::{JobId, Owner, Timestamp};

/// The four parameters a job was trained with, keyed by type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParameters {
    pub encoding: ModelParameter,
    pub bucketing: ModelParameter,
    pub learner: ModelParameter,
    pub predictiontype: ModelParameter,
}

/// Presentation metadata stored alongside the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiData {
    pub log_file: PathBuf,
    pub start_date: Timestamp,
    pub owner: Owner,
}

/// On-disk training record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub parameters: TrainingParameters,
    pub ui_data: UiData,
}

impl TrainingRecord {
    /// Record for a job; a job that has not started yet is stamped with now.
    pub fn from_job(job: &Job) -> Self {
        Self {
            parameters: TrainingParameters {
                encoding: job.encoding.clone(),
                bucketing: job.bucketing.clone(),
                learner: job.learner.clone(),
                predictiontype: job.outcome.clone(),
            },
            ui_data: UiData {
                log_file: job.log_file.clone(),
                start_date: job.start_time.unwrap_or_else(chrono::Utc::now),
                owner: job.owner.clone(),
            },
        }
    }
}

/// A training record together with the job id it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredJob {
    pub id: JobId,
    pub record: TrainingRecord,
}

impl StoredJob {
    /// Rebuild the job as `Completed` with its recorded start time.
    pub fn into_job(self) -> Job {
        let TrainingRecord { parameters, ui_data } = self.record;
        Job {
            id: self.id,
            owner: ui_data.owner,
            encoding: parameters.encoding,
            bucketing: parameters.bucketing,
            learner: parameters.learner,
            outcome: parameters.predictiontype,
            log_file: ui_data.log_file,
            status: JobStatus::Completed,
            start_time: Some(ui_data.start_date),
        }
    }

    pub fn start_date(&self) -> Timestamp {
        self.record.ui_data.start_date
    }
}

/// Storage seam for training records.
pub trait TrainingStore: Send + Sync {
    /// Every readable record. Unreadable files are skipped with a warning.
    fn list_all(&self) -> Result<Vec<StoredJob>, CoreError>;

    fn read(&self, id: &str) -> Result<StoredJob, CoreError>;

    fn write(&self, job: &Job) -> Result<(), CoreError>;

    /// Remove a record. Returns `false` if it did not exist.
    fn delete(&self, id: &str) -> Result<bool, CoreError>;

    fn path_for(&self, id: &str) -> PathBuf;

    /// Records owned by `owner`.
    fn list_by_owner(&self, owner: &str) -> Result<Vec<StoredJob>, CoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|stored| stored.record.ui_data.owner == owner)
            .collect())
    }
}

/// [`TrainingStore`] over a directory of `{job-id}.json` files.
#[derive(Debug, Clone)]
pub struct FsTrainingStore {
    dir: PathBuf,
}

impl FsTrainingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TrainingStore for FsTrainingStore {
    fn list_all(&self) -> Result<Vec<StoredJob>, CoreError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut jobs = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match read_json::<TrainingRecord>(&path) {
                Ok(record) => jobs.push(StoredJob {
                    id: id.to_string(),
                    record,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable training record");
                }
            }
        }
        Ok(jobs)
    }

    fn read(&self, id: &str) -> Result<StoredJob, CoreError> {
        let record = read_json(&self.path_for(id)).map_err(|e| match e {
            CoreError::NotFound { .. } => CoreError::MissingEntity {
                entity: "TrainingRecord",
                id: id.to_string(),
            },
            other => other,
        })?;
        Ok(StoredJob {
            id: id.to_string(),
            record,
        })
    }

    fn write(&self, job: &Job) -> Result<(), CoreError> {
        let path = self.path_for(&job.id);
        write_json_atomic(&path, &TrainingRecord::from_job(job))?;
        tracing::debug!(job_id = %job.id, path = %path.display(), "Training record written");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, CoreError> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}
