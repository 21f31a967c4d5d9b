//! Job queue and bounded executor.
//!
//! Jobs are generated into a per-owner pending queue, then deployed onto a
//! worker pool of `pool_size` concurrent tasks gated by a semaphore. Each
//! job moves `QUEUED -> RUNNING -> FINISHING -> COMPLETED`, or to `FAILED`
//! from any non-terminal state, and every transition is published on the
//! [`EventBus`].

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use ppm_core::error::CoreError;
use ppm_core::job::{Job, JobStatus};
use ppm_core::model_params::ParameterSelection;
use ppm_core::types::{JobId, Owner};
use ppm_events::{EventBus, JobEvent};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::job_cache::JobCache;
use crate::live::LiveJobs;
use crate::runner::{JobRunner, ServiceJob};

/// Result of a [`JobManager::stop_job`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The job was still in the pending queue; it was removed and failed.
    RemovedPending,
    /// The job had been deployed but not started; it will never start.
    CancelledQueued,
    /// The job was running; its execution is being interrupted.
    CancelledRunning,
    /// The job is not live (unknown, completed or failed). Nothing to do.
    NotLive,
}

/// State shared with every spawned worker task.
#[derive(Clone)]
struct Worker {
    runner: Arc<dyn JobRunner>,
    bus: Arc<EventBus>,
    live: Arc<LiveJobs>,
    job_cache: Arc<JobCache>,
    permits: Arc<Semaphore>,
}

pub struct JobManager {
    pending: Mutex<HashMap<Owner, VecDeque<Job>>>,
    staged_logs: Mutex<HashMap<Owner, PathBuf>>,
    worker: Worker,
    tracker: TaskTracker,
}

impl JobManager {
    pub fn new(
        pool_size: usize,
        runner: Arc<dyn JobRunner>,
        bus: Arc<EventBus>,
        live: Arc<LiveJobs>,
        job_cache: Arc<JobCache>,
    ) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            staged_logs: Mutex::new(HashMap::new()),
            worker: Worker {
                runner,
                bus,
                live,
                job_cache,
                permits: Arc::new(Semaphore::new(pool_size.max(1))),
            },
            tracker: TaskTracker::new(),
        }
    }

    /// Record the log the owner's next [`generate_jobs`](Self::generate_jobs)
    /// call trains on.
    pub fn stage_log(&self, owner: &str, log_file: impl Into<PathBuf>) {
        let log_file = log_file.into();
        tracing::debug!(owner, log_file = %log_file.display(), "Log staged");
        self.staged_logs.lock().insert(owner.to_string(), log_file);
    }

    pub fn staged_log(&self, owner: &str) -> Option<PathBuf> {
        self.staged_logs.lock().get(owner).cloned()
    }

    /// Append the cross product encodings x bucketings x learners for the
    /// first prediction type to the owner's pending queue.
    ///
    /// Order is encoding outer, bucketing middle, learner inner. Consumes
    /// the staged log.
    pub fn generate_jobs(&self, params: &ParameterSelection, owner: &str) -> Result<Vec<Job>, CoreError> {
        params.validate()?;
        let log_file = self
            .staged_logs
            .lock()
            .remove(owner)
            .ok_or_else(|| CoreError::Validation("No log file selected".into()))?;
        let outcome = &params.prediction_type[0];

        let started = std::time::Instant::now();
        let mut generated = Vec::with_capacity(params.job_count());
        for encoding in &params.encoding {
            for bucketing in &params.bucketing {
                for learner in &params.learner {
                    generated.push(Job::new(
                        owner,
                        encoding.clone(),
                        bucketing.clone(),
                        learner.clone(),
                        outcome.clone(),
                        log_file.clone(),
                    ));
                }
            }
        }

        self.pending
            .lock()
            .entry(owner.to_string())
            .or_default()
            .extend(generated.iter().cloned());

        tracing::info!(
            owner,
            count = generated.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Jobs generated",
        );
        Ok(generated)
    }

    /// Hand every pending job of `owner` to the worker pool, in generation
    /// order. Returns the deployed jobs.
    pub fn deploy_jobs(&self, owner: &str) -> Vec<Job> {
        let jobs: Vec<Job> = self
            .pending
            .lock()
            .get_mut(owner)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default();
        if jobs.is_empty() {
            tracing::debug!(owner, "No pending jobs to deploy");
            return jobs;
        }

        let tokens: Vec<CancellationToken> = jobs.iter().map(|job| self.worker.live.register(job)).collect();
        self.worker.bus.publish(JobEvent::queued(owner, jobs.clone()));

        for (job, cancel) in jobs.iter().cloned().zip(tokens) {
            let worker = self.worker.clone();
            self.tracker.spawn(worker.run(job, cancel));
        }

        tracing::info!(owner, count = jobs.len(), "Jobs deployed");
        jobs
    }

    /// Drop the owner's pending jobs. Deployed jobs are unaffected.
    pub fn flush_jobs(&self, owner: &str) -> usize {
        let removed = self
            .pending
            .lock()
            .get_mut(owner)
            .map(|queue| {
                let n = queue.len();
                queue.clear();
                n
            })
            .unwrap_or(0);
        tracing::debug!(owner, removed, "Pending jobs flushed");
        removed
    }

    /// Best-effort cancellation of one of the owner's jobs. Jobs of other
    /// owners are reported as not live.
    pub fn stop_job(&self, owner: &str, job_id: &str) -> StopOutcome {
        if let Some(mut job) = self.take_pending(owner, job_id) {
            tracing::info!(job_id, owner = %job.owner, "Pending job stopped");
            self.worker.fail(&mut job, "Job was stopped before it started");
            return StopOutcome::RemovedPending;
        }

        match self.worker.live.cancel(owner, job_id) {
            Some(JobStatus::Queued) => {
                tracing::info!(job_id, "Queued job stopped");
                StopOutcome::CancelledQueued
            }
            Some(status) if !status.is_terminal() => {
                tracing::info!(job_id, status = %status, "Running job stop requested");
                StopOutcome::CancelledRunning
            }
            _ => StopOutcome::NotLive,
        }
    }

    pub fn pending_jobs(&self, owner: &str) -> Vec<Job> {
        self.pending
            .lock()
            .get(owner)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Cancel every deployed job. Used on shutdown.
    pub fn stop_all(&self) -> usize {
        let cancelled = self.worker.live.cancel_all();
        tracing::info!(cancelled, "Live jobs cancelled");
        cancelled
    }

    pub fn live_job_ids(&self) -> Vec<JobId> {
        self.worker.live.ids()
    }

    /// Snapshots of the owner's deployed, unfinished jobs.
    pub fn live_jobs(&self, owner: &str) -> Vec<Job> {
        self.worker.live.for_owner(owner)
    }

    /// Run an untracked service job on the worker pool.
    pub fn run_service_job(&self, job: Arc<dyn ServiceJob>) -> JoinHandle<Result<(), CoreError>> {
        let permits = self.worker.permits.clone();
        self.tracker.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| CoreError::Execution("Worker pool closed".into()))?;
            let name = job.describe();
            tracing::info!(job = %name, "Service job started");

            let result = async {
                job.pre_process().await?;
                job.execute().await?;
                job.post_execute().await
            }
            .await;

            match &result {
                Ok(()) => tracing::info!(job = %name, "Service job finished"),
                Err(e) => tracing::error!(job = %name, error = %e, "Service job failed"),
            }
            result
        })
    }

    /// Wait until every spawned job and service job has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn take_pending(&self, owner: &str, job_id: &str) -> Option<Job> {
        let mut pending = self.pending.lock();
        let queue = pending.get_mut(owner)?;
        let idx = queue.iter().position(|job| job.id == job_id)?;
        queue.remove(idx)
    }
}

impl Worker {
    async fn run(self, mut job: Job, cancel: CancellationToken) {
        let permit = tokio::select! {
            permit = self.permits.clone().acquire_owned() => permit,
            _ = cancel.cancelled() => {
                self.fail(&mut job, "Job was stopped before it started");
                self.live.remove(&job.id);
                return;
            }
        };
        let Ok(_permit) = permit else {
            self.fail(&mut job, "Worker pool closed");
            self.live.remove(&job.id);
            return;
        };
        if cancel.is_cancelled() {
            self.fail(&mut job, "Job was stopped before it started");
            self.live.remove(&job.id);
            return;
        }

        match self.execute_phases(&mut job, &cancel).await {
            Ok(()) => {
                self.live.remove(&job.id);
                self.job_cache.put(Arc::new(job));
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, owner = %job.owner, error = %e, "Job failed");
                self.fail(&mut job, e.to_string());
                self.live.remove(&job.id);
            }
        }
    }

    async fn execute_phases(&self, job: &mut Job, cancel: &CancellationToken) -> Result<(), CoreError> {
        self.advance(job, JobStatus::Running)?;
        tracing::info!(job_id = %job.id, owner = %job.owner, "Job started");

        self.runner.pre_process(job).await?;
        if cancel.is_cancelled() {
            return Err(CoreError::Execution("Job was stopped".into()));
        }
        self.runner.execute(job, cancel.clone()).await?;

        self.advance(job, JobStatus::Finishing)?;
        self.runner.post_execute(job).await?;

        self.advance(job, JobStatus::Completed)?;
        tracing::info!(job_id = %job.id, owner = %job.owner, "Job completed");
        Ok(())
    }

    fn advance(&self, job: &mut Job, next: JobStatus) -> Result<(), CoreError> {
        job.transition(next)?;
        self.live.update(job);
        self.bus.publish(JobEvent::status(job));
        Ok(())
    }

    fn fail(&self, job: &mut Job, reason: impl Into<String>) {
        if job.transition(JobStatus::Failed).is_ok() {
            self.live.update(job);
            self.bus.publish(JobEvent::status(job).with_error(reason));
        }
    }
}
