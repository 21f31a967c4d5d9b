//! Tracing consumer for job notifications.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every [`JobEvent`] to the log. It runs as a long-lived background
//! task and exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::JobEvent;

pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel closes.
    pub async fn run(mut receiver: broadcast::Receiver<JobEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some notifications were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &JobEvent) {
        for job in &event.jobs {
            match &event.error {
                Some(error) => tracing::warn!(
                    event_type = %event.event_type,
                    owner = %event.owner,
                    job_id = %job.id,
                    status = %job.status,
                    error = %error,
                    "Job notification",
                ),
                None => tracing::info!(
                    event_type = %event.event_type,
                    owner = %event.owner,
                    job_id = %job.id,
                    status = %job.status,
                    "Job notification",
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn exits_when_bus_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventLogger::run(bus.subscribe()));

        bus.publish(JobEvent::queued("alice", Vec::new()));
        drop(bus);

        handle.await.expect("logger task should finish cleanly");
    }
}
