//! HTTP clients for the external snapshot feed and image API.

pub mod feed;
pub mod image;

pub use feed::HttpSnapshotSource;
pub use image::HttpImageSource;

use std::time::Duration;

use stationcast_core::error::{AppError, ErrorKind};
use stationcast_core::result::AppResult;

/// Longest response body excerpt carried in an error.
const BODY_EXCERPT_LIMIT: usize = 512;

fn build_client(timeout_seconds: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e))
}

fn request_failed(what: &str, err: reqwest::Error) -> AppError {
    AppError::with_source(
        ErrorKind::ExternalService,
        format!("{what} request failed: {err}"),
        err,
    )
}

/// Pass successful responses through; turn anything else into an
/// `ExternalService` error carrying the status and a body excerpt.
async fn ensure_success(what: &str, response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(BODY_EXCERPT_LIMIT).collect();
    Err(AppError::external_service(format!(
        "{what} returned HTTP {}: {excerpt}",
        status.as_u16()
    )))
}
