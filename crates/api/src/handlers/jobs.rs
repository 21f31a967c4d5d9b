//! Handlers for the `/jobs` resource.
//!
//! Every endpoint is scoped to the [`Owner`] of the request.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use ppm_core::model_params::ParameterSelection;
use ppm_engine::queue::StopOutcome;
use serde::Serialize;

use super::blocking;
use crate::error::AppResult;
use crate::middleware::owner::Owner;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FlushResult {
    pub flushed: usize,
}

#[derive(Debug, Serialize)]
pub struct StopResult {
    pub job_id: String,
    pub outcome: StopOutcome,
}

// ---------------------------------------------------------------------------
// Pending batch
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/generate
///
/// Build one job per (encoding, bucketing, learner) combination against the
/// staged log and append them to the owner's pending queue. Returns 201 with
/// the new jobs.
pub async fn generate_jobs(
    owner: Owner,
    State(state): State<AppState>,
    Json(selection): Json<ParameterSelection>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.engine.jobs.generate_jobs(&selection, owner.as_str())?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: jobs })))
}

/// GET /api/v1/jobs/pending
pub async fn list_pending(owner: Owner, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.engine.jobs.pending_jobs(owner.as_str());
    Ok(Json(DataResponse { data: jobs }))
}

/// DELETE /api/v1/jobs/pending
pub async fn flush_pending(owner: Owner, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let flushed = state.engine.jobs.flush_jobs(owner.as_str());
    Ok(Json(DataResponse {
        data: FlushResult { flushed },
    }))
}

/// POST /api/v1/jobs/deploy
///
/// Submit the pending batch to the worker pool. Returns 202 with the
/// deployed jobs; progress is published on the event bus.
pub async fn deploy_jobs(owner: Owner, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.engine.jobs.deploy_jobs(owner.as_str());
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: jobs })))
}

// ---------------------------------------------------------------------------
// Live and completed jobs
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/live
pub async fn list_live(owner: Owner, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.engine.jobs.live_jobs(owner.as_str());
    Ok(Json(DataResponse { data: jobs }))
}

/// POST /api/v1/jobs/{id}/stop
///
/// Best-effort cancellation. Stopping a job that is no longer live, or that
/// belongs to another owner, is a no-op reported as `not_live`.
pub async fn stop_job(
    owner: Owner,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.engine.jobs.stop_job(owner.as_str(), &job_id);
    tracing::info!(owner = %owner.as_str(), job_id = %job_id, outcome = ?outcome, "Stop requested");

    Ok(Json(DataResponse {
        data: StopResult { job_id, outcome },
    }))
}

/// GET /api/v1/jobs
///
/// The owner's completed jobs, served from the job cache.
pub async fn list_completed(owner: Owner, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let engine = state.engine.clone();
    let jobs = blocking(move || engine.job_cache.get_jobs(owner.as_str())).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}/charts
///
/// Chart generation reads result files, so it runs on the blocking pool.
pub async fn job_charts(
    owner: Owner,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let engine = state.engine.clone();
    let charts = blocking(move || engine.charts_for(owner.as_str(), &job_id)).await?;
    Ok(Json(DataResponse { data: charts }))
}
