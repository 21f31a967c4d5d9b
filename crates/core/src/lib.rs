//! Domain types and pure logic for the predictive-process-monitoring
//! training service.
//!
//! Nothing in this crate spawns tasks or holds shared state. It provides:
//!
//! - [`job`] -- the training job descriptor and its status machine.
//! - [`naming`] -- the result-file naming convention and resolver.
//! - [`training`] -- the persisted per-job training record store.
//! - [`model_params`] -- model parameter definitions and the provider seam.
//! - [`logs`] -- the user event-log catalogue and dataset descriptors.
//! - [`config`] -- environment-driven engine configuration.
//! - [`json_file`] -- atomic JSON file helpers.

pub mod config;
pub mod error;
pub mod job;
pub mod json_file;
pub mod logs;
pub mod model_params;
pub mod naming;
pub mod training;
pub mod types;
