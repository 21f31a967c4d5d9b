//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource. Handlers
//! delegate to the [`Engine`](ppm_engine::Engine) and map errors via
//! [`AppError`](crate::error::AppError).

pub mod jobs;
pub mod logs;
pub mod parameters;

use ppm_core::error::CoreError;

use crate::error::{AppError, AppResult};

/// Run a filesystem-bound engine call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::InternalError(format!("Blocking task failed: {e}")))?
        .map_err(AppError::from)
}
