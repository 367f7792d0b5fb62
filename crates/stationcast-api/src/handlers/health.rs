//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /health
///
/// Answers 503 when either backend fails its health check.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status_backend = state.status.health_check().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Status backend health check failed");
        false
    });
    let artifact_store = state.artifacts.health_check().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Artifact store health check failed");
        false
    });

    let healthy = status_backend && artifact_store;
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status_backend,
            artifact_store,
        }),
    )
}
