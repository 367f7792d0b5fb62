//! Route definitions for the Stationcast HTTP API.

use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::get;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(job_routes())
        .merge(artifact_routes())
        .route("/health", get(handlers::health::health))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Submit, status and results
fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/start",
            get(handlers::jobs::start).post(handlers::jobs::start),
        )
        .route("/status", get(handlers::jobs::status))
        .route("/results", get(handlers::jobs::results))
}

/// Signed artifact downloads
fn artifact_routes() -> Router<AppState> {
    Router::new().route("/artifacts/{*key}", get(handlers::artifacts::download))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use stationcast_core::config::AppConfig;
    use stationcast_core::types::JobId;
    use stationcast_status::StatusStore;
    use stationcast_status::memory::MemoryStatusBackend;
    use stationcast_storage::providers::LocalArtifactStore;
    use stationcast_storage::{ArtifactStoreManager, ResultsReader, UrlSigner};
    use stationcast_worker::JobDispatcher;
    use stationcast_worker::queue::{CommandQueueManager, MemoryCommandQueue};

    const BASE: &str = "http://test.local";

    struct TestApp {
        _dir: tempfile::TempDir,
        state: AppState,
        router: Router,
    }

    async fn test_app() -> TestApp {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::default();
        let signer = UrlSigner::new("secret", BASE).unwrap();
        let store = LocalArtifactStore::new(dir.path().to_str().unwrap(), signer.clone())
            .await
            .unwrap();
        let artifacts = ArtifactStoreManager::from_store(Arc::new(store), &config.storage);
        let status = StatusStore::from_backend(Arc::new(MemoryStatusBackend::new()), &config.status);
        let queues = CommandQueueManager::from_queue(
            Arc::new(MemoryCommandQueue::new(std::time::Duration::from_secs(60))),
            &config.queue,
        );
        let state = AppState {
            config: Arc::new(config),
            status: status.clone(),
            dispatcher: JobDispatcher::new(status, queues),
            results: ResultsReader::new(artifacts.clone()),
            artifacts,
            signer,
        };
        TestApp {
            _dir: dir,
            router: build_router(state.clone()),
            state,
        }
    }

    async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Bytes) {
        let response = router
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    fn json(body: &Bytes) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_start_accepts_and_status_reports_queued() {
        let app = test_app().await;
        let (code, body) = send(&app.router, "POST", "/start").await;
        assert_eq!(code, StatusCode::ACCEPTED);
        let started = json(&body);
        assert_eq!(started["status"], "queued");
        let job_id = started["jobId"].as_str().unwrap().to_string();

        let (code, body) = send(&app.router, "GET", &format!("/status?jobId={job_id}")).await;
        assert_eq!(code, StatusCode::OK);
        let view = json(&body);
        assert_eq!(view["jobId"], job_id.as_str());
        assert_eq!(view["status"], "queued");
        assert_eq!(view["completed"], 0);
        assert!(view["total"].is_null());
        assert!(view["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn test_start_with_duplicate_id_conflicts() {
        let app = test_app().await;
        let (code, _) = send(&app.router, "GET", "/start?jobId=mine").await;
        assert_eq!(code, StatusCode::ACCEPTED);
        let (code, body) = send(&app.router, "GET", "/start?jobId=mine").await;
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(json(&body)["error"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_missing_job_id_is_bad_request() {
        let app = test_app().await;
        for path in ["/status", "/results"] {
            let (code, body) = send(&app.router, "GET", path).await;
            assert_eq!(code, StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(json(&body)["error"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_unknown_job_status_is_not_found() {
        let app = test_app().await;
        let (code, _) = send(&app.router, "GET", "/status?jobId=ghost").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_results_are_empty_before_any_artifact() {
        let app = test_app().await;
        let (code, body) = send(&app.router, "GET", "/results?jobId=ghost").await;
        assert_eq!(code, StatusCode::OK);
        let results = json(&body);
        assert_eq!(results["jobId"], "ghost");
        assert_eq!(results["images"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_results_links_are_downloadable() {
        let app = test_app().await;
        let job = JobId::parse("job-1").unwrap();
        app.state.status.create(&job).await.unwrap();
        app.state
            .artifacts
            .store()
            .put("job-1/6260.png", Bytes::from_static(b"png-bytes"), "image/png")
            .await
            .unwrap();

        let (_, body) = send(&app.router, "GET", "/results?jobId=job-1").await;
        let url = json(&body)["images"][0].as_str().unwrap().to_string();
        let path = url.strip_prefix(BASE).unwrap();

        let (code, body) = send(&app.router, "GET", path).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(&body[..], b"png-bytes");
    }

    #[tokio::test]
    async fn test_artifact_with_bad_signature_is_forbidden() {
        let app = test_app().await;
        app.state
            .artifacts
            .store()
            .put("job-1/a.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();
        let expires = Utc::now().timestamp() + 60;

        let (code, _) = send(&app.router, "GET", "/artifacts/job-1/a.png").await;
        assert_eq!(code, StatusCode::FORBIDDEN);
        let uri = format!("/artifacts/job-1/a.png?expires={expires}&signature=00ff");
        let (code, _) = send(&app.router, "GET", &uri).await;
        assert_eq!(code, StatusCode::FORBIDDEN);

        let stale = Utc::now().timestamp() - 1;
        let signature = app.state.signer.signature("job-1/a.png", stale).unwrap();
        let uri = format!("/artifacts/job-1/a.png?expires={stale}&signature={signature}");
        let (code, _) = send(&app.router, "GET", &uri).await;
        assert_eq!(code, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let app = test_app().await;
        let (code, body) = send(&app.router, "GET", "/health").await;
        assert_eq!(code, StatusCode::OK);
        let health = json(&body);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["statusBackend"], true);
    }
}
