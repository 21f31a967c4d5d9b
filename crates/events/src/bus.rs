//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] carries [`JobEvent`]s from the job executor to whoever
//! tracks job progress. It is shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use ppm_core::job::{Job, JobStatus};
use ppm_core::types::Owner;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A batch of jobs was handed to the worker pool.
pub const EVENT_JOBS_QUEUED: &str = "jobs.queued";

/// A single job changed status.
pub const EVENT_JOB_STATUS: &str = "job.status";

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// A job status notification.
///
/// Built with [`JobEvent::queued`] for a deployed batch or
/// [`JobEvent::status`] for a single transition, optionally enriched with
/// [`with_error`](JobEvent::with_error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// One of [`EVENT_JOBS_QUEUED`] or [`EVENT_JOB_STATUS`].
    pub event_type: String,

    pub owner: Owner,

    /// Snapshots of the affected jobs, taken when the event was created.
    pub jobs: Vec<Job>,

    /// Failure reason for `FAILED` transitions.
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    /// Every job of a deploy batch entered the pool as `QUEUED`.
    pub fn queued(owner: impl Into<Owner>, jobs: Vec<Job>) -> Self {
        Self {
            event_type: EVENT_JOBS_QUEUED.into(),
            owner: owner.into(),
            jobs,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// One job moved to a new status.
    pub fn status(job: &Job) -> Self {
        Self {
            event_type: EVENT_JOB_STATUS.into(),
            owner: job.owner.clone(),
            jobs: vec![job.clone()],
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Status of the first job in the event.
    pub fn job_status(&self) -> Option<JobStatus> {
        self.jobs.first().map(|job| job.status)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use ppm_events::bus::{EventBus, JobEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(JobEvent::queued("alice", Vec::new()));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers observe `RecvError::Lagged` once the buffer is full.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ppm_core::model_params::{
        ModelParameter, TYPE_BUCKETING, TYPE_ENCODING, TYPE_LEARNER, TYPE_PREDICTION,
    };

    use super::*;

    fn job() -> Job {
        Job::new(
            "alice",
            ModelParameter::new("agg", TYPE_ENCODING),
            ModelParameter::new("zero", TYPE_BUCKETING),
            ModelParameter::new("xgboost", TYPE_LEARNER),
            ModelParameter::new("remtime", TYPE_PREDICTION),
            "/logs/bpi.csv",
        )
    }

    #[tokio::test]
    async fn status_event_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let job = job();

        bus.publish(JobEvent::status(&job).with_error("boom"));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, EVENT_JOB_STATUS);
        assert_eq!(received.owner, "alice");
        assert_eq!(received.jobs[0].id, job.id);
        assert_eq!(received.job_status(), Some(JobStatus::Queued));
        assert_eq!(received.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_batch() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(JobEvent::queued("alice", vec![job(), job()]));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.event_type, EVENT_JOBS_QUEUED);
        assert_eq!(e2.jobs.len(), 2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(JobEvent::queued("nobody", Vec::new()));
    }
}
