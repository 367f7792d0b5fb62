//! External data sources: the snapshot feed and the per-item image API.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::ItemKey;

/// Fetches the external snapshot a job expands from.
#[async_trait]
pub trait SnapshotSource: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch and parse the current snapshot.
    ///
    /// A non-success response is an `ExternalService` error.
    async fn fetch_snapshot(&self) -> AppResult<serde_json::Value>;
}

/// Raw image returned by an [`ImageSource`].
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Encoded image bytes.
    pub bytes: Bytes,
    /// Content type reported by the remote, if any.
    pub content_type: Option<String>,
}

/// Fetches the remote resource a work item is rendered from.
#[async_trait]
pub trait ImageSource: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch the image for one item.
    ///
    /// A non-success response is an `ExternalService` error.
    async fn fetch_image(
        &self,
        item_key: &ItemKey,
        item: &serde_json::Value,
    ) -> AppResult<FetchedImage>;
}
