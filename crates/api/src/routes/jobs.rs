//! Route definitions for the `/jobs` resource.
//!
//! All endpoints require the `x-owner` header.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_completed
/// POST   /generate        -> generate_jobs
/// GET    /pending         -> list_pending
/// DELETE /pending         -> flush_pending
/// POST   /deploy          -> deploy_jobs
/// GET    /live            -> list_live
/// POST   /{id}/stop       -> stop_job
/// GET    /{id}/charts     -> job_charts
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_completed))
        .route("/generate", post(jobs::generate_jobs))
        .route("/pending", get(jobs::list_pending).delete(jobs::flush_pending))
        .route("/deploy", post(jobs::deploy_jobs))
        .route("/live", get(jobs::list_live))
        .route("/{id}/stop", post(jobs::stop_job))
        .route("/{id}/charts", get(jobs::job_charts))
}
