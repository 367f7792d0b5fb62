//! End-to-end pipeline tests: submit, expand, render, count, list results.

mod helpers;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use serde_json::{Value, json};

use stationcast_core::traits::queue::CommandQueue;
use stationcast_core::types::{ItemKey, JobId, WorkCommand, encode_command};

fn is_completed(body: &Value) -> bool {
    body["status"] == "completed"
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_stations_complete_with_three_images() {
    let app = helpers::TestApp::start(helpers::snapshot_with(&[6260, 6310, 6240]), &[]).await;
    let job_id = app.submit().await;

    let status = app.wait_for_status(&job_id, is_completed).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["completed"], 3);
    assert_eq!(status["total"], 3);

    let results = app.request("GET", &format!("/results?jobId={job_id}")).await;
    assert_eq!(results.status, StatusCode::OK);
    let images = results.body["images"].as_array().unwrap();
    assert_eq!(images.len(), 3);
    assert!(images[0].as_str().unwrap().contains(&format!("/artifacts/{job_id}/6240.png")));

    for url in images {
        let path = url.as_str().unwrap().strip_prefix(helpers::BASE_URL).unwrap();
        let download = app.request("GET", path).await;
        assert_eq!(download.status, StatusCode::OK);
        assert!(image::load_from_memory(&download.raw).is_ok());
    }

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_item_fetch_leaves_job_processing() {
    let app = helpers::TestApp::start(helpers::snapshot_with(&[1, 2, 3]), &["2"]).await;
    let job_id = app.submit().await;

    app.wait_for_status(&job_id, |b| b["completed"] == 2).await;
    app.wait_until_drained().await;

    let status = app.request("GET", &format!("/status?jobId={job_id}")).await;
    assert_eq!(status.body["status"], "processing");
    assert_eq!(status.body["completed"], 2);
    assert_eq!(status.body["total"], 3);

    let results = app.request("GET", &format!("/results?jobId={job_id}")).await;
    assert_eq!(results.body["images"].as_array().unwrap().len(), 2);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_empty_snapshot_completes_immediately() {
    let app = helpers::TestApp::start(json!({ "stationmeasurements": [] }), &[]).await;
    let job_id = app.submit().await;

    let status = app.wait_for_status(&job_id, is_completed).await;
    assert_eq!(status["total"], 0);
    assert_eq!(status["completed"], 0);

    let results = app.request("GET", &format!("/results?jobId={job_id}")).await;
    assert_eq!(results.body["images"], json!([]));
    assert_eq!(app.images.calls.load(Ordering::SeqCst), 0);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fan_out_is_capped() {
    let ids: Vec<u32> = (1..=60).collect();
    let app = helpers::TestApp::start(helpers::snapshot_with(&ids), &[]).await;
    let job_id = app.submit().await;

    let status = app.wait_for_status(&job_id, is_completed).await;
    assert_eq!(status["total"], 50);
    assert_eq!(status["completed"], 50);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_redelivered_work_is_not_double_counted() {
    let app = helpers::TestApp::start(helpers::snapshot_with(&[10, 20]), &[]).await;
    let job_id = app.submit().await;
    app.wait_for_status(&job_id, is_completed).await;

    let duplicate = encode_command(&WorkCommand {
        job_id: JobId::parse(job_id.as_str()).unwrap(),
        item_key: Some(ItemKey::parse("10").unwrap()),
        item: json!({ "stationid": 10, "temperature": 4.0 }),
    })
    .unwrap();
    app.queue.publish("image-queue", duplicate.clone()).await.unwrap();
    app.queue.publish("image-queue", duplicate).await.unwrap();
    app.wait_until_drained().await;

    let status = app.request("GET", &format!("/status?jobId={job_id}")).await;
    assert_eq!(status.body["completed"], 2);
    assert_eq!(status.body["status"], "completed");
    assert_eq!(app.images.calls.load(Ordering::SeqCst), 4);

    let results = app.request("GET", &format!("/results?jobId={job_id}")).await;
    assert_eq!(results.body["images"].as_array().unwrap().len(), 2);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_jobs_are_isolated() {
    let app = helpers::TestApp::start(helpers::snapshot_with(&[1, 2, 3, 4]), &[]).await;
    let first = app.submit().await;
    let second = app.submit().await;
    assert_ne!(first, second);

    for job_id in [&first, &second] {
        let status = app.wait_for_status(job_id, is_completed).await;
        assert_eq!(status["completed"], 4);
        let results = app.request("GET", &format!("/results?jobId={job_id}")).await;
        let images = results.body["images"].as_array().unwrap();
        assert_eq!(images.len(), 4);
        assert!(images.iter().all(|u| u.as_str().unwrap().contains(job_id.as_str())));
    }
    assert_eq!(app.snapshot.calls.load(Ordering::SeqCst), 2);

    app.shutdown().await;
}
