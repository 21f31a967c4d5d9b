#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use ppm_api::config::ServerConfig;
use ppm_api::router::build_app_router;
use ppm_api::state::AppState;
use ppm_core::config::{Directories, EngineConfig};
use ppm_core::error::CoreError;
use ppm_core::job::Job;
use ppm_core::model_params::{ModelConfiguration, ModelParameter};
use ppm_core::training::{FsTrainingStore, TrainingStore};
use ppm_engine::runner::JobRunner;
use ppm_engine::Engine;
use ppm_events::EventBus;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const OWNER: &str = "alice";
pub const LOG_FILE: &str = "bpi.csv";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// Runner that writes classification results instead of training.
pub struct FakeTrainer {
    dirs: Directories,
    store: FsTrainingStore,
}

#[async_trait]
impl JobRunner for FakeTrainer {
    async fn pre_process(&self, job: &Job) -> Result<(), CoreError> {
        self.store.write(job)
    }

    async fn execute(&self, job: &Job, _cancel: CancellationToken) -> Result<(), CoreError> {
        let log = job.log_name();
        std::fs::write(
            self.dirs.detailed.join(format!("detailed_{log}_{}_class.csv", job.id)),
            "actual,predicted\ntrue,true\nfalse,true\n",
        )?;
        std::fs::write(
            self.dirs.validation.join(format!("validation_{log}_{}_class.csv", job.id)),
            "metric,nr_events,score\nauc,1,0.6\n",
        )?;
        std::fs::write(
            self.dirs.feature_importance.join(format!("feat_importance_{log}_{}_1.csv", job.id)),
            "feature,importance\nage,0.7\n",
        )?;
        Ok(())
    }

    async fn post_execute(&self, _job: &Job) -> Result<(), CoreError> {
        Ok(())
    }
}

pub struct TestApp {
    pub tmp: TempDir,
    pub app: Router,
    pub engine: Arc<Engine>,
}

/// Build the full application router over a temp data root holding one log.
///
/// Uses the same router builder as `main.rs` so tests exercise the same
/// middleware stack.
pub fn build_test_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::rooted_at(tmp.path());
    config.dirs.create_all().unwrap();
    std::fs::write(
        config.dirs.user_logs.join(LOG_FILE),
        "case,activity,time\n",
    )
    .unwrap();

    let params = ModelConfiguration::new(
        vec![
            ModelParameter::new("agg", "encoding"),
            ModelParameter::new("zero", "bucketing"),
            ModelParameter::new("xgboost", "learner"),
            ModelParameter::new("remtime", "predictiontype"),
        ],
        vec!["agg".into(), "zero".into(), "xgboost".into(), "remtime".into()],
    );
    let runner = Arc::new(FakeTrainer {
        dirs: config.dirs.clone(),
        store: FsTrainingStore::new(&config.dirs.training),
    });
    let engine = Arc::new(
        Engine::with_runner(config, Arc::new(params), Arc::new(EventBus::default()), runner).unwrap(),
    );

    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(test_config()),
    };

    TestApp {
        tmp,
        app: build_app_router(state),
        engine,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    owner: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header("x-owner", owner);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(OWNER), None).await
}

pub async fn post(app: &Router, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    send(app, Method::POST, uri, Some(OWNER), body).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
