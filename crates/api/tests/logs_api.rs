mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn available_logs_are_listed() {
    let test = build_test_app();
    std::fs::write(test.tmp.path().join("logs").join("notes.txt"), "ignored").unwrap();

    let response = get(&test.app, "/api/v1/logs").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"],
        json!([{"file_name": "bpi.csv", "name": "bpi"}])
    );
}

#[tokio::test]
async fn staging_an_unknown_log_returns_404() {
    let test = build_test_app();
    let response = post(&test.app, "/api/v1/logs/missing.csv/stage", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dataset_generation_exposes_target_columns() {
    let test = build_test_app();
    let roles = json!({
        "case_id_col": "case",
        "timestamp_col": "time",
        "activity_col": "activity",
        "static_cat_cols": ["channel"],
        "static_num_cols": ["amount"],
    });

    let response = post(&test.app, &format!("/api/v1/logs/{LOG_FILE}/dataset"), Some(roles)).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["data"], "bpi");
    test.engine.jobs.wait_idle().await;

    let columns = get(&test.app, "/api/v1/logs/bpi/columns").await;
    assert_eq!(columns.status(), StatusCode::OK);
    assert_eq!(body_json(columns).await["data"], json!(["channel", "amount"]));
}

#[tokio::test]
async fn columns_without_dataset_return_404() {
    let test = build_test_app();
    let response = get(&test.app, "/api/v1/logs/bpi/columns").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn basic_parameters_are_grouped_by_type() {
    let test = build_test_app();
    let response = get(&test.app, &format!("/api/v1/logs/{LOG_FILE}/parameters")).await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["encoding"][0]["id"], "agg");
    assert_eq!(json["data"]["learner"][0]["id"], "xgboost");
    assert_eq!(json["data"]["predictiontype"][0]["id"], "remtime");
}

#[tokio::test]
async fn every_parameter_is_listed() {
    let test = build_test_app();
    let json = body_json(get(&test.app, "/api/v1/parameters").await).await;

    assert_eq!(json["data"].as_array().unwrap().len(), 4);
}
