use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ppm_api::background;
use ppm_api::config::ServerConfig;
use ppm_api::router::build_app_router;
use ppm_api::state::AppState;
use ppm_core::config::EngineConfig;
use ppm_core::model_params::ModelConfiguration;
use ppm_engine::Engine;
use ppm_events::{EventBus, EventLogger};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ppm_api=debug,ppm_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let engine_config = EngineConfig::from_env().expect("Invalid engine configuration");
    let disposal_interval = engine_config.disposal_interval;

    // --- Model parameters ---
    let params = ModelConfiguration::load(
        &engine_config.model_config_path,
        &engine_config.dirs.optimized_params,
    )
    .expect("Failed to load model configuration");
    tracing::info!(
        path = %engine_config.model_config_path.display(),
        "Model configuration loaded"
    );

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    // --- Engine ---
    let engine = Arc::new(
        Engine::new(engine_config, Arc::new(params), Arc::clone(&event_bus))
            .expect("Failed to initialise engine"),
    );

    // --- Background tasks ---
    let background_cancel = CancellationToken::new();
    let disposal_handle = tokio::spawn(background::disposal::run(
        Arc::clone(&engine),
        disposal_interval,
        background_cancel.clone(),
    ));
    let eviction_handle = tokio::spawn(background::cache_eviction::run(
        Arc::clone(&engine),
        background_cancel.clone(),
    ));
    tracing::info!("Background services started (disposal, cache eviction, event logger)");

    // --- App state ---
    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    background_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), disposal_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), eviction_handle).await;
    tracing::info!("Background services stopped");

    // Running jobs are interrupted; their subprocesses die with them.
    engine.jobs.stop_all();
    let _ = tokio::time::timeout(Duration::from_secs(10), engine.jobs.wait_idle()).await;

    // The logger exits once every sender is gone.
    drop(engine);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
