//! Job status notifications.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`] -- a status notification for one job or a queued batch.
//! - [`EventLogger`] -- background consumer that traces every notification.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, JobEvent};
pub use logger::EventLogger;
