//! Dataset generation service job.
//!
//! Writes `{datasets_dir}/{log}.json`, the column-role descriptor the
//! training scripts and the target-column lookup read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ppm_core::error::CoreError;
use ppm_core::json_file::write_json_atomic;
use ppm_core::logs::{log_base_name, ColumnRoles, DatasetDescriptor};

use crate::runner::ServiceJob;

#[derive(Debug)]
pub struct DataSetGenerationJob {
    log_name: String,
    descriptor: DatasetDescriptor,
    target: PathBuf,
}

impl DataSetGenerationJob {
    /// Validate the roles and prepare the descriptor for `log_file`.
    pub fn new(roles: ColumnRoles, log_file: &Path, datasets_dir: &Path) -> Result<Self, CoreError> {
        let log_name = log_base_name(log_file);
        if log_name.is_empty() {
            return Err(CoreError::Validation(format!(
                "Cannot derive a log name from {}",
                log_file.display()
            )));
        }
        Ok(Self {
            target: DatasetDescriptor::path_for(datasets_dir, &log_name),
            descriptor: DatasetDescriptor::from_roles(roles)?,
            log_name,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

#[async_trait]
impl ServiceJob for DataSetGenerationJob {
    fn describe(&self) -> String {
        format!("dataset generation for {}", self.log_name)
    }

    async fn execute(&self) -> Result<(), CoreError> {
        write_json_atomic(&self.target, &self.descriptor)
    }

    async fn post_execute(&self) -> Result<(), CoreError> {
        if !self.target.exists() {
            return Err(CoreError::Execution(format!(
                "Could not write dataset descriptor {}",
                self.target.display()
            )));
        }
        tracing::info!(log_name = %self.log_name, path = %self.target.display(), "Dataset descriptor written");
        Ok(())
    }
}
