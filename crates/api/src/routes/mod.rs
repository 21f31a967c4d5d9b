pub mod health;
pub mod jobs;
pub mod logs;
pub mod parameters;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// `/jobs/*` and `/logs/{name}/stage` are scoped to the owner named by the
/// `x-owner` header.
///
/// ```text
/// /logs                                   list available logs (GET)
/// /logs/{name}/stage                      select the log for the next batch (POST)
/// /logs/{name}/dataset                    generate the dataset descriptor (POST)
/// /logs/{name}/columns                    prediction target columns (GET)
/// /logs/{name}/parameters                 basic or optimized parameters (GET)
///
/// /parameters                             every known model parameter (GET)
///
/// /jobs                                   completed jobs (GET)
/// /jobs/generate                          build the pending batch (POST)
/// /jobs/pending                           list (GET), flush (DELETE)
/// /jobs/deploy                            submit the pending batch (POST)
/// /jobs/live                              queued and running jobs (GET)
/// /jobs/{id}/stop                         best-effort cancellation (POST)
/// /jobs/{id}/charts                       result charts (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/logs", logs::router())
        .nest("/parameters", parameters::router())
        .nest("/jobs", jobs::router())
}
