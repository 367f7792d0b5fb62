//! Shared test helpers for integration tests.
//!
//! Builds the full pipeline on in-memory backends: HTTP router, dispatcher,
//! both worker runners, a temporary artifact directory, and scripted
//! snapshot/image sources in place of the external APIs.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use stationcast_api::{AppState, build_app};
use stationcast_core::config::AppConfig;
use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::source::{FetchedImage, ImageSource, SnapshotSource};
use stationcast_core::types::ItemKey;
use stationcast_status::StatusStore;
use stationcast_status::memory::MemoryStatusBackend;
use stationcast_storage::providers::LocalArtifactStore;
use stationcast_storage::{ArtifactStoreManager, ResultsReader, UrlSigner};
use stationcast_worker::queue::MemoryCommandQueue;
use stationcast_worker::{
    CommandQueueManager, FeedExpander, JobDispatcher, StationImageWorker, WorkerRunner,
};

/// Base URL used in generated artifact links
pub const BASE_URL: &str = "http://stationcast.test";

/// Snapshot source returning a fixed document
#[derive(Debug)]
pub struct ScriptedSnapshot {
    pub snapshot: Value,
    pub calls: AtomicU32,
}

#[async_trait]
impl SnapshotSource for ScriptedSnapshot {
    async fn fetch_snapshot(&self) -> AppResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.clone())
    }
}

/// Image source that serves a small PNG, failing for selected keys
#[derive(Debug)]
pub struct ScriptedImages {
    pub failing: HashSet<String>,
    pub calls: AtomicU32,
}

#[async_trait]
impl ImageSource for ScriptedImages {
    async fn fetch_image(&self, item_key: &ItemKey, _item: &Value) -> AppResult<FetchedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(item_key.as_str()) {
            return Err(AppError::external_service("Image API returned HTTP 502: upstream down"));
        }
        Ok(FetchedImage {
            bytes: png(16, 12),
            content_type: Some("image/png".to_string()),
        })
    }
}

/// A solid white PNG
pub fn png(width: u32, height: u32) -> Bytes {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode test png");
    Bytes::from(buf)
}

/// Response captured from the router
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub raw: Bytes,
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for direct store access
    pub state: AppState,
    /// In-memory queue transport
    pub queue: MemoryCommandQueue,
    /// Snapshot source handed to the expander
    pub snapshot: Arc<ScriptedSnapshot>,
    /// Image source handed to the station worker
    pub images: Arc<ScriptedImages>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    _artifacts_dir: tempfile::TempDir,
}

impl TestApp {
    /// Start the pipeline over `snapshot`, failing image fetches for `failing` keys
    pub async fn start(snapshot: Value, failing: &[&str]) -> Self {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let mut config = AppConfig::default();
        config.server.public_base_url = BASE_URL.to_string();
        config.worker.poll_interval_millis = 5;
        config.storage.root_path = dir.path().to_string_lossy().into_owned();

        let signer = UrlSigner::new("integration-secret", BASE_URL).expect("signer");
        let store = LocalArtifactStore::new(&config.storage.root_path, signer.clone())
            .await
            .expect("artifact store");
        let artifacts = ArtifactStoreManager::from_store(Arc::new(store), &config.storage);
        let status = StatusStore::from_backend(Arc::new(MemoryStatusBackend::new()), &config.status);

        let queue = MemoryCommandQueue::new(Duration::from_secs(60));
        let queues = CommandQueueManager::from_queue(Arc::new(queue.clone()), &config.queue);

        let snapshot = Arc::new(ScriptedSnapshot {
            snapshot,
            calls: AtomicU32::new(0),
        });
        let images = Arc::new(ScriptedImages {
            failing: failing.iter().map(|k| k.to_string()).collect(),
            calls: AtomicU32::new(0),
        });

        let expander = FeedExpander::new(
            status.clone(),
            queues.clone(),
            snapshot.clone(),
            config.feed.clone(),
        );
        let worker = StationImageWorker::new(
            status.clone(),
            artifacts.clone(),
            images.clone(),
            config.feed.item_key_field.clone(),
        );

        let (shutdown, cancel) = watch::channel(false);
        let runners = [
            WorkerRunner::new(queues.clone(), queues.start_queue(), Arc::new(expander), &config.worker),
            WorkerRunner::new(queues.clone(), queues.work_queue(), Arc::new(worker), &config.worker),
        ];
        let workers = runners
            .into_iter()
            .map(|runner| {
                let cancel = cancel.clone();
                tokio::spawn(async move { runner.run(cancel).await })
            })
            .collect();

        let state = AppState {
            config: Arc::new(config),
            dispatcher: JobDispatcher::new(status.clone(), queues),
            status,
            results: ResultsReader::new(artifacts.clone()),
            artifacts,
            signer,
        };

        Self {
            router: build_app(state.clone()),
            state,
            queue,
            snapshot,
            images,
            shutdown,
            workers,
            _artifacts_dir: dir,
        }
    }

    /// Make a request against the router
    pub async fn request(&self, method: &str, uri: &str) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let raw = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);
        TestResponse { status, body, raw }
    }

    /// Submit a job and return its id
    pub async fn submit(&self) -> String {
        let response = self.request("POST", "/start").await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
        response.body["jobId"]
            .as_str()
            .expect("jobId in start response")
            .to_string()
    }

    /// Poll `/status` until `done` accepts the body or five seconds pass
    pub async fn wait_for_status<F: Fn(&Value) -> bool>(&self, job_id: &str, done: F) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let response = self.request("GET", &format!("/status?jobId={job_id}")).await;
            if done(&response.body) || tokio::time::Instant::now() >= deadline {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until both queues have nothing ready or in flight
    pub async fn wait_until_drained(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            if self.queue.pending("start-queue").await == 0
                && self.queue.pending("image-queue").await == 0
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Stop the worker runners
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for worker in self.workers {
            worker.await.expect("worker task");
        }
    }
}

/// A snapshot in the nested shape with the given station ids
pub fn snapshot_with(ids: &[u32]) -> Value {
    let stations: Vec<Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "stationid": id,
                "stationname": format!("Meetstation {id}"),
                "temperature": 4.0 + f64::from(*id % 10),
            })
        })
        .collect();
    serde_json::json!({ "actual": { "stationmeasurements": stations } })
}
