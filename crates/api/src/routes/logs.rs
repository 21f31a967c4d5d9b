//! Route definitions for the `/logs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::logs;
use crate::state::AppState;

/// Routes mounted at `/logs`.
///
/// ```text
/// GET    /                      -> list_logs
/// POST   /{name}/stage          -> stage_log
/// POST   /{name}/dataset        -> generate_dataset
/// GET    /{name}/columns        -> log_columns
/// GET    /{name}/parameters     -> basic_parameters
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(logs::list_logs))
        .route("/{name}/stage", post(logs::stage_log))
        .route("/{name}/dataset", post(logs::generate_dataset))
        .route("/{name}/columns", get(logs::log_columns))
        .route("/{name}/parameters", get(logs::basic_parameters))
}
