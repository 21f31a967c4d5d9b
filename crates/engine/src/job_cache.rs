//! Per-owner cache of completed jobs, populated lazily from training records.

use std::sync::Arc;
use std::time::Duration;

use ppm_core::error::CoreError;
use ppm_core::job::Job;
use ppm_core::training::TrainingStore;

use crate::cache::OwnerCache;
use crate::live::LiveJobs;

/// Completed jobs by owner.
///
/// A cold owner is populated from the training store on first lookup;
/// later lookups are served from memory until the cache is flushed.
pub struct JobCache {
    cache: OwnerCache<Job>,
    store: Arc<dyn TrainingStore>,
    live: Arc<LiveJobs>,
}

impl JobCache {
    pub fn new(store: Arc<dyn TrainingStore>, live: Arc<LiveJobs>) -> Self {
        Self {
            cache: OwnerCache::new(),
            store,
            live,
        }
    }

    /// An owner's completed jobs, ordered by start time then id.
    pub fn get_jobs(&self, owner: &str) -> Result<Vec<Arc<Job>>, CoreError> {
        if let Some(holder) = self.cache.holder(owner) {
            let mut holder = holder.lock();
            if !holder.is_empty() {
                tracing::debug!(owner, "Job cache hit");
                return Ok(holder.all());
            }
        }

        // The holder is locked before the store is listed, so a job finishing
        // mid-load waits in `put` instead of missing both paths.
        let holder = self.cache.get_or_create(owner);
        let mut holder = holder.lock();
        let mut jobs = holder.all();
        let known = jobs.len();
        jobs.extend(
            self.load_from_disk(owner)?
                .into_iter()
                .filter(|job| !holder.contains(&job.id)),
        );
        if jobs.len() > known {
            jobs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
            holder.flush();
            for job in &jobs {
                holder.add(job.id.clone(), [job.clone()]);
            }
        }
        Ok(jobs)
    }

    pub fn get_job(&self, owner: &str, id: &str) -> Result<Option<Arc<Job>>, CoreError> {
        Ok(self.get_jobs(owner)?.into_iter().find(|job| job.id == id))
    }

    /// Insert a freshly completed job if its owner is already cached.
    ///
    /// Returns whether the job was inserted. A cold owner picks the job up
    /// from disk on its first lookup instead.
    pub fn put(&self, job: Arc<Job>) -> bool {
        let Some(holder) = self.cache.holder(&job.owner) else {
            return false;
        };
        let mut holder = holder.lock();
        if holder.contains(&job.id) {
            return false;
        }
        tracing::debug!(job_id = %job.id, owner = %job.owner, "Completed job added to cache");
        holder.add(job.id.clone(), [job]);
        true
    }

    pub fn flush(&self) {
        self.cache.flush();
    }

    pub fn evict_expired(&self, ttl: Duration) -> usize {
        self.cache.evict_expired(ttl)
    }

    pub fn cached_owners(&self) -> Vec<String> {
        self.cache.owners()
    }

    fn load_from_disk(&self, owner: &str) -> Result<Vec<Arc<Job>>, CoreError> {
        let jobs: Vec<Arc<Job>> = self
            .store
            .list_by_owner(owner)?
            .into_iter()
            .filter(|stored| !self.live.contains(&stored.id))
            .map(|stored| Arc::new(stored.into_job()))
            .collect();

        tracing::debug!(owner, count = jobs.len(), "Loaded completed jobs from disk");
        Ok(jobs)
    }
}
