//! Periodic reaping of old jobs.
//!
//! Runs a disposal sweep on a fixed interval using `tokio::time::interval`.
//! The first sweep happens at startup. Sweeps touch the filesystem, so each
//! one runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use ppm_engine::Engine;
use tokio_util::sync::CancellationToken;

/// Run the disposal loop every `interval` until `cancel` is triggered.
pub async fn run(engine: Arc<Engine>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        age_secs = engine.disposal.age().as_secs(),
        "Disposal job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Disposal job stopping");
                break;
            }
            _ = ticker.tick() => {
                let disposal = Arc::clone(&engine.disposal);
                match tokio::task::spawn_blocking(move || disposal.run_once()).await {
                    Ok(report) if report.disposed > 0 || report.errors > 0 => {
                        tracing::info!(
                            disposed = report.disposed,
                            errors = report.errors,
                            "Disposal: reaped old jobs"
                        );
                    }
                    Ok(_) => tracing::debug!("Disposal: nothing to reap"),
                    Err(e) => tracing::error!(error = %e, "Disposal: sweep panicked"),
                }
            }
        }
    }
}
