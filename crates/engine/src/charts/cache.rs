//! Owner-keyed chart cache in front of the [`ChartGenerator`].

use std::sync::Arc;
use std::time::Duration;

use ppm_core::job::Job;

use super::{Chart, ChartGenerator};
use crate::cache::OwnerCache;

pub struct ChartCache {
    cache: OwnerCache<Chart>,
    generator: ChartGenerator,
}

impl ChartCache {
    pub fn new(generator: ChartGenerator) -> Self {
        Self {
            cache: OwnerCache::new(),
            generator,
        }
    }

    /// Charts for `job`, generated on first request and then served from
    /// memory. Repeated calls return the same `Arc`s until the cache is
    /// cleared.
    pub fn get_charts(&self, job: &Job) -> Vec<Arc<Chart>> {
        let holder = self.cache.get_or_create(&job.owner);
        let mut holder = holder.lock();

        if let Some(charts) = holder.get(&job.id) {
            tracing::debug!(job_id = %job.id, owner = %job.owner, "Chart cache hit");
            return charts;
        }

        // Generation happens under the owner's lock so concurrent requests
        // for the same job never generate twice.
        let charts: Vec<Arc<Chart>> = self.generator.generate(job).into_iter().map(Arc::new).collect();
        holder.add(job.id.clone(), charts.iter().cloned());
        charts
    }

    pub fn clear(&self) {
        self.cache.flush();
    }

    pub fn evict_expired(&self, ttl: Duration) -> usize {
        self.cache.evict_expired(ttl)
    }

    pub fn cached_owners(&self) -> Vec<String> {
        self.cache.owners()
    }
}
