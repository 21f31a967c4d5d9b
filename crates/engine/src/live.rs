//! Registry of jobs handed to the worker pool and not yet finished.
//!
//! Shared between the job queue, which registers and updates entries, and
//! the job cache, which must not load a live job from disk.

use std::collections::HashMap;

use parking_lot::RwLock;
use ppm_core::job::{Job, JobStatus};
use ppm_core::types::JobId;
use tokio_util::sync::CancellationToken;

struct LiveEntry {
    job: Job,
    cancel: CancellationToken,
}

/// Jobs currently queued in or running on the worker pool.
#[derive(Default)]
pub struct LiveJobs {
    entries: RwLock<HashMap<JobId, LiveEntry>>,
}

impl LiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a submitted job and return its cancellation token.
    pub fn register(&self, job: &Job) -> CancellationToken {
        let cancel = CancellationToken::new();
        self.entries.write().insert(
            job.id.clone(),
            LiveEntry {
                job: job.clone(),
                cancel: cancel.clone(),
            },
        );
        cancel
    }

    /// Record the latest snapshot of a live job.
    pub fn update(&self, job: &Job) {
        if let Some(entry) = self.entries.write().get_mut(&job.id) {
            entry.job = job.clone();
        }
    }

    pub fn remove(&self, id: &str) {
        self.entries.write().remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.entries.read().get(id).map(|entry| entry.job.status)
    }

    /// Cancel one of the owner's live jobs. Returns its status at the time of
    /// the request, or `None` if the owner has no such live job.
    pub fn cancel(&self, owner: &str, id: &str) -> Option<JobStatus> {
        let entries = self.entries.read();
        let entry = entries.get(id).filter(|entry| entry.job.owner == owner)?;
        entry.cancel.cancel();
        Some(entry.job.status)
    }

    /// Cancel every live job regardless of owner.
    pub fn cancel_all(&self) -> usize {
        let entries = self.entries.read();
        for entry in entries.values() {
            entry.cancel.cancel();
        }
        entries.len()
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.entries.read().keys().cloned().collect()
    }

    /// Snapshots of an owner's live jobs.
    pub fn for_owner(&self, owner: &str) -> Vec<Job> {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.job.owner == owner)
            .map(|entry| entry.job.clone())
            .collect()
    }
}
