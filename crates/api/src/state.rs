use std::sync::Arc;

use ppm_engine::Engine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Job queue, caches, disposal and the stores they read.
    pub engine: Arc<Engine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
