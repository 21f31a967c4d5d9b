//! Owner extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the caller's session key.
pub const OWNER_HEADER: &str = "x-owner";

/// The owner every job and cache lookup of a request is scoped to.
///
/// No authentication is performed; the header value is trusted as-is.
///
/// ```ignore
/// async fn my_handler(owner: Owner) -> AppResult<Json<()>> {
///     tracing::info!(owner = %owner.0, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl Owner {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("Missing {OWNER_HEADER} header")))?;

        Ok(Owner(value.to_string()))
    }
}
