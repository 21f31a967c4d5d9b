//! Periodic reaping of old jobs' files.
//!
//! One sweep deletes the training record and every result file of each job
//! whose start date is at least `age` ago, then empties both caches so no
//! reaped job is served from memory. Deletion is best-effort: failures are
//! logged and counted, never raised.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ppm_core::job::Job;
use ppm_core::naming::NamingResolver;
use ppm_core::training::{StoredJob, TrainingStore};
use ppm_core::types::Timestamp;

use crate::charts::ChartCache;
use crate::job_cache::JobCache;
use crate::live::LiveJobs;

/// Outcome of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposalReport {
    /// Jobs whose files were reaped.
    pub disposed: usize,
    /// Deletions (or listings) that failed.
    pub errors: usize,
}

pub struct DisposalTask {
    store: Arc<dyn TrainingStore>,
    naming: Arc<NamingResolver>,
    job_cache: Arc<JobCache>,
    chart_cache: Arc<ChartCache>,
    live: Arc<LiveJobs>,
    age: Duration,
}

impl DisposalTask {
    pub fn new(
        store: Arc<dyn TrainingStore>,
        naming: Arc<NamingResolver>,
        job_cache: Arc<JobCache>,
        chart_cache: Arc<ChartCache>,
        live: Arc<LiveJobs>,
        age: Duration,
    ) -> Self {
        Self {
            store,
            naming,
            job_cache,
            chart_cache,
            live,
            age,
        }
    }

    pub fn age(&self) -> Duration {
        self.age
    }

    /// Run one sweep against the current time.
    pub fn run_once(&self) -> DisposalReport {
        self.run_at(chrono::Utc::now())
    }

    /// Run one sweep treating `now` as the current time.
    pub fn run_at(&self, now: Timestamp) -> DisposalReport {
        let mut report = DisposalReport::default();

        match self.store.list_all() {
            Ok(stored) => {
                for job in stored {
                    if self.live.contains(&job.id) || !self.is_expired(&job, now) {
                        continue;
                    }
                    report.errors += self.dispose(job);
                    report.disposed += 1;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to list training records for disposal");
                report.errors += 1;
            }
        }

        self.job_cache.flush();
        self.chart_cache.clear();

        tracing::info!(
            disposed = report.disposed,
            errors = report.errors,
            "Disposal sweep finished",
        );
        report
    }

    fn is_expired(&self, job: &StoredJob, now: Timestamp) -> bool {
        (now - job.start_date())
            .to_std()
            .map(|elapsed| elapsed >= self.age)
            .unwrap_or(false)
    }

    /// Delete every file of one job. Returns the number of failed deletions.
    fn dispose(&self, stored: StoredJob) -> usize {
        let job = stored.into_job();
        tracing::debug!(job_id = %job.id, owner = %job.owner, "Disposing job");

        let mut errors = 0;
        if let Err(e) = self.store.delete(&job.id) {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to delete training record");
            errors += 1;
        }
        for path in self.result_files(&job) {
            if !remove_if_present(&path) {
                errors += 1;
            }
        }
        errors
    }

    fn result_files(&self, job: &Job) -> Vec<PathBuf> {
        let mut files = Vec::new();
        // The classification flag is read from disk, so resolve both
        // classified files before anything is deleted.
        for path in [self.naming.detailed_file(job, true), self.naming.validation_file(job, true)] {
            match path {
                Ok(path) => files.push(path),
                Err(e) => tracing::warn!(job_id = %job.id, error = %e, "Failed to resolve result file"),
            }
        }
        match self.naming.feature_importance_files(job, true) {
            Ok(paths) => files.extend(paths),
            Err(e) => tracing::warn!(job_id = %job.id, error = %e, "Failed to list feature importance files"),
        }
        files
    }
}

/// Remove a file; a missing file counts as success.
fn remove_if_present(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete result file");
            false
        }
    }
}
