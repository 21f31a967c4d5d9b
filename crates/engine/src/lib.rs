//! Job lifecycle and result caching for the training service.
//!
//! - [`queue`] -- pending queues, the bounded worker pool and job phases.
//! - [`runner`] -- the [`JobRunner`](runner::JobRunner) seam and the
//!   training-script runner.
//! - [`job_cache`] / [`charts`] -- owner-keyed caches over result files.
//! - [`disposal`] -- periodic reaping of old jobs.
//! - [`engine`] -- wires everything together.

pub mod cache;
pub mod charts;
pub mod dataset;
pub mod disposal;
pub mod engine;
pub mod job_cache;
pub mod live;
pub mod queue;
pub mod runner;
pub mod subprocess;

pub use engine::Engine;
