//! Job runner seam and the default training-script runner.
//!
//! A job runs in three phases: [`pre_process`](JobRunner::pre_process),
//! [`execute`](JobRunner::execute) and
//! [`post_execute`](JobRunner::post_execute). The queue publishes
//! `FINISHING` between the last two and turns any phase error into
//! `FAILED`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use ppm_core::error::CoreError;
use ppm_core::job::Job;
use ppm_core::naming::NamingResolver;
use ppm_core::training::TrainingStore;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::subprocess::run_command;

/// Name of the training entry point inside the script directory.
pub const TRAIN_SCRIPT: &str = "train.py";

/// Executes the phases of a training job.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn pre_process(&self, job: &Job) -> Result<(), CoreError>;

    /// The long-running phase. Must stop promptly once `cancel` fires.
    async fn execute(&self, job: &Job, cancel: CancellationToken) -> Result<(), CoreError>;

    async fn post_execute(&self, job: &Job) -> Result<(), CoreError>;
}

/// An untracked background job run on the worker pool (e.g. dataset
/// generation). It has no status and emits no notifications.
#[async_trait]
pub trait ServiceJob: Send + Sync {
    /// Short description used in logs.
    fn describe(&self) -> String;

    async fn pre_process(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn execute(&self) -> Result<(), CoreError>;

    async fn post_execute(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Runs `train.py` for each job and checks its result files.
pub struct TrainingScriptRunner {
    python: String,
    script_dir: PathBuf,
    store: Arc<dyn TrainingStore>,
    naming: Arc<NamingResolver>,
}

impl TrainingScriptRunner {
    pub fn new(
        python: impl Into<String>,
        script_dir: impl Into<PathBuf>,
        store: Arc<dyn TrainingStore>,
        naming: Arc<NamingResolver>,
    ) -> Self {
        Self {
            python: python.into(),
            script_dir: script_dir.into(),
            store,
            naming,
        }
    }

    /// The JSON document piped to the script's stdin.
    pub fn script_input(job: &Job) -> serde_json::Value {
        serde_json::json!({
            "job_id": job.id,
            "log_file": job.log_file,
            "encoding": job.encoding.id,
            "bucketing": job.bucketing.id,
            "learner": job.learner.id,
            "predictiontype": job.outcome.parameter,
            "parameters": job.learner.property_map(),
        })
    }
}

#[async_trait]
impl JobRunner for TrainingScriptRunner {
    async fn pre_process(&self, job: &Job) -> Result<(), CoreError> {
        if !job.log_file.is_file() {
            return Err(CoreError::Validation(format!(
                "Log file {} does not exist",
                job.log_file.display()
            )));
        }
        self.store.write(job)
    }

    async fn execute(&self, job: &Job, cancel: CancellationToken) -> Result<(), CoreError> {
        let mut cmd = Command::new(&self.python);
        cmd.arg(self.script_dir.join(TRAIN_SCRIPT))
            .arg(job.log_name())
            .arg(&job.id)
            .arg(&job.outcome.parameter)
            .current_dir(&self.script_dir);

        tracing::info!(job_id = %job.id, script_dir = %self.script_dir.display(), "Starting training script");
        let output = run_command(&mut cmd, &Self::script_input(job), &cancel).await?;

        if !output.success() {
            tracing::error!(
                job_id = %job.id,
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "Training script failed",
            );
            return Err(CoreError::Execution(format!(
                "Training script exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }

        tracing::info!(job_id = %job.id, duration_ms = output.duration_ms, "Training script finished");
        Ok(())
    }

    async fn post_execute(&self, job: &Job) -> Result<(), CoreError> {
        self.naming.detailed_file(job, false)?;
        // Prefix bucketing reports an empty run instead of an error.
        if self.naming.feature_importance_files(job, false)?.is_empty() {
            let first = self.naming.feature_importance_files(job, true)?;
            return Err(CoreError::not_found(first.into_iter().next().unwrap_or_default()));
        }
        Ok(())
    }
}
