use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/parameters
///
/// Every configured model parameter, of every type.
pub async fn list_parameters(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let parameters = state.engine.params.parameters().to_vec();
    Ok(Json(DataResponse { data: parameters }))
}
