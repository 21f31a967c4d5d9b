//! Handlers for the `/logs` resource.
//!
//! Logs are addressed by file name (`bpi.csv`); dataset-derived lookups accept
//! either the file name or its base name.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use ppm_core::logs::{log_base_name, ColumnRoles};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::owner::Owner;
use crate::response::DataResponse;
use crate::state::AppState;

/// A log available for training.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub file_name: String,
    pub name: String,
}

/// Body of a successful staging request.
#[derive(Debug, Serialize)]
pub struct StagedLog {
    pub owner: String,
    pub file_name: String,
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// GET /api/v1/logs
pub async fn list_logs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let logs: Vec<LogEntry> = state
        .engine
        .available_logs()?
        .iter()
        .filter_map(|path| {
            let file_name = path.file_name()?.to_string_lossy().into_owned();
            Some(LogEntry {
                name: log_base_name(path),
                file_name,
            })
        })
        .collect();

    Ok(Json(DataResponse { data: logs }))
}

/// POST /api/v1/logs/{name}/stage
///
/// Select the log the owner's next generated batch trains on.
pub async fn stage_log(
    owner: Owner,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let log_file = state.engine.find_log(&name)?;
    state.engine.jobs.stage_log(owner.as_str(), &log_file);

    tracing::info!(owner = %owner.as_str(), log = %name, "Log staged");

    Ok(Json(DataResponse {
        data: StagedLog {
            owner: owner.0,
            file_name: name,
        },
    }))
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// POST /api/v1/logs/{name}/dataset
///
/// Queue dataset generation on the worker pool. Returns 202 immediately;
/// failures are logged by the worker.
pub async fn generate_dataset(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(roles): Json<ColumnRoles>,
) -> AppResult<impl IntoResponse> {
    let log_file = state.engine.find_log(&name)?;
    // Detached: the worker pool owns the task.
    let _ = state.engine.generate_dataset(&log_file, roles)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: log_base_name(&log_file),
        }),
    ))
}

/// GET /api/v1/logs/{name}/columns
pub async fn log_columns(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let columns = state.engine.log_columns(&log_base_name(&name))?;
    Ok(Json(DataResponse { data: columns }))
}

/// GET /api/v1/logs/{name}/parameters
///
/// Optimized hyperparameters for the log when present, otherwise the basic set.
pub async fn basic_parameters(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let selection = state.engine.params.gather_basic_parameters(&log_base_name(&name));
    Ok(Json(DataResponse { data: selection }))
}
