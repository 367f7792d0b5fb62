//! Snapshot feed client.

use async_trait::async_trait;
use tracing::{debug, error};

use stationcast_core::config::feed::FeedConfig;
use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::source::SnapshotSource;

use super::{build_client, ensure_success, request_failed};

/// Fetches the JSON snapshot over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    /// Create a client for the configured feed URL.
    pub fn new(config: &FeedConfig) -> AppResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_snapshot(&self) -> AppResult<serde_json::Value> {
        debug!(url = %self.url, "Fetching snapshot");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| request_failed("Snapshot", e))?;
        let response = ensure_success("Snapshot feed", response).await.inspect_err(|e| {
            error!(url = %self.url, error = %e, "Snapshot fetch failed");
        })?;
        response.json().await.map_err(|e| {
            AppError::external_service(format!("Snapshot feed returned invalid JSON: {e}"))
        })
    }
}
