//! Eviction of idle owners from the job and chart caches.

use std::sync::Arc;

use ppm_engine::Engine;
use tokio_util::sync::CancellationToken;

/// Evict owners idle for longer than the configured TTL, checking once per
/// TTL, until `cancel` is triggered.
pub async fn run(engine: Arc<Engine>, cancel: CancellationToken) {
    let ttl = engine.config.cache_ttl;
    tracing::info!(ttl_secs = ttl.as_secs(), "Cache eviction job started");

    let mut ticker = tokio::time::interval(ttl);
    // The first tick fires immediately and would find nothing idle.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cache eviction job stopping");
                break;
            }
            _ = ticker.tick() => {
                let (jobs, charts) = engine.evict_idle();
                if jobs > 0 || charts > 0 {
                    tracing::info!(job_owners = jobs, chart_owners = charts, "Evicted idle cache owners");
                } else {
                    tracing::debug!("Cache eviction: no idle owners");
                }
            }
        }
    }
}
