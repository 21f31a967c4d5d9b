//! Training job descriptor and status machine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::logs::log_base_name;
use crate::model_params::{is_prefix_bucketing, ModelParameter};
use crate::types::{JobId, Owner, Timestamp};

/// Lifecycle status of a training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Finishing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Statuses reachable from `self`.
    ///
    /// Completed and Failed are terminal and return an empty slice.
    pub fn valid_transitions(self) -> &'static [JobStatus] {
        use JobStatus::*;
        match self {
            // Queued -> Running, Failed
            Queued => &[Running, Failed],
            // Running -> Finishing, Completed, Failed
            Running => &[Finishing, Completed, Failed],
            // Finishing -> Completed, Failed
            Finishing => &[Completed, Failed],
            Completed | Failed => &[],
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Finishing => "FINISHING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One training job: a single (encoding, bucketing, learner, outcome)
/// combination over one event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner: Owner,
    pub encoding: ModelParameter,
    pub bucketing: ModelParameter,
    pub learner: ModelParameter,
    pub outcome: ModelParameter,
    pub log_file: PathBuf,
    pub status: JobStatus,
    /// Set when execution begins; restored from the training record for
    /// completed jobs loaded from disk.
    pub start_time: Option<Timestamp>,
}

impl Job {
    /// A freshly generated job in the `Queued` state with a new UUID v4 id.
    pub fn new(
        owner: impl Into<Owner>,
        encoding: ModelParameter,
        bucketing: ModelParameter,
        learner: ModelParameter,
        outcome: ModelParameter,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            encoding,
            bucketing,
            learner,
            outcome,
            log_file: log_file.into(),
            status: JobStatus::Queued,
            start_time: None,
        }
    }

    /// Move to `next`, stamping `start_time` when the job starts running.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::Validation(format!(
                "Job {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        if next == JobStatus::Running {
            self.start_time = Some(chrono::Utc::now());
        }
        self.status = next;
        Ok(())
    }

    /// Base name of the source log (file name without extension).
    pub fn log_name(&self) -> String {
        log_base_name(&self.log_file)
    }

    /// Whether the job buckets by prefix length (one result set per prefix).
    pub fn uses_prefix_bucketing(&self) -> bool {
        is_prefix_bucketing(&self.bucketing.id)
    }
}
