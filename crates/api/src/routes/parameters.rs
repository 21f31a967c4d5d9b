use axum::routing::get;
use axum::Router;

use crate::handlers::parameters;
use crate::state::AppState;

/// Routes mounted at `/parameters`.
///
/// ```text
/// GET    /                -> list_parameters
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(parameters::list_parameters))
}
