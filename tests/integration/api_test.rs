//! Integration tests for the HTTP surface.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_unknown_job_status_is_not_found() {
    let app = helpers::TestApp::start(json!({ "stationmeasurements": [] }), &[]).await;

    let response = app.request("GET", "/status?jobId=does-not-exist").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");

    app.shutdown().await;
}

#[tokio::test]
async fn test_missing_job_id_is_rejected() {
    let app = helpers::TestApp::start(json!({ "stationmeasurements": [] }), &[]).await;

    assert_eq!(app.request("GET", "/status").await.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.request("GET", "/results").await.status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

#[tokio::test]
async fn test_start_over_get_is_accepted() {
    let app = helpers::TestApp::start(json!({ "stationmeasurements": [] }), &[]).await;

    let response = app.request("GET", "/start?jobId=nightly-run").await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body, json!({ "jobId": "nightly-run", "status": "queued" }));

    app.shutdown().await;
}

#[tokio::test]
async fn test_results_for_unknown_job_are_empty() {
    let app = helpers::TestApp::start(json!({ "stationmeasurements": [] }), &[]).await;

    let response = app.request("GET", "/results?jobId=nobody").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "jobId": "nobody", "images": [] }));

    app.shutdown().await;
}

#[tokio::test]
async fn test_tampered_artifact_link_is_forbidden() {
    let app = helpers::TestApp::start(helpers::snapshot_with(&[7]), &[]).await;
    let job_id = app.submit().await;
    app.wait_for_status(&job_id, |b| b["status"] == "completed").await;

    let results = app.request("GET", &format!("/results?jobId={job_id}")).await;
    let url = results.body["images"][0].as_str().unwrap().to_string();
    let path = url.strip_prefix(helpers::BASE_URL).unwrap();
    let tampered = path.replace("7.png", "8.png");

    assert_eq!(app.request("GET", &tampered).await.status, StatusCode::FORBIDDEN);

    app.shutdown().await;
}

#[tokio::test]
async fn test_health_is_ok() {
    let app = helpers::TestApp::start(json!({ "stationmeasurements": [] }), &[]).await;

    let response = app.request("GET", "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");

    app.shutdown().await;
}
