//! Signed artifact downloads.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use stationcast_core::error::AppError;

use crate::dto::request::ArtifactQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /artifacts/{*key}?expires=&signature=
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ArtifactQuery>,
) -> Result<Response, ApiError> {
    let Some((expires, signature)) = query.credentials() else {
        return Err(AppError::forbidden("Missing artifact signature").into());
    };
    state.signer.verify(&key, expires, signature, Utc::now())?;

    let bytes = state.artifacts.store().read_bytes(&key).await?;
    let mut response = Body::from(bytes).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&key)),
    );
    Ok(response)
}

/// Content type from the artifact's extension.
fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
