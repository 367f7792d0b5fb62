//! Artifact store trait for pluggable object storage backends.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::{ItemKey, JobId};

/// Metadata about a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArtifactMeta {
    /// Key within the store, e.g. `job-1/6260.png`.
    pub key: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// Key under which a job's item artifact is stored.
pub fn artifact_key(job_id: &JobId, item_key: &ItemKey, extension: &str) -> String {
    format!("{job_id}/{item_key}.{extension}")
}

/// Prefix shared by every artifact of a job.
pub fn job_prefix(job_id: &JobId) -> String {
    format!("{job_id}/")
}

/// Trait for artifact storage backends.
///
/// Writes are keyed overwrites, so repeating a write for the same key is
/// harmless.
#[async_trait]
pub trait ArtifactStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Write (or overwrite) an artifact.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()>;

    /// Read an artifact into memory.
    async fn read_bytes(&self, key: &str) -> AppResult<Bytes>;

    /// List artifacts whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> AppResult<Vec<ArtifactMeta>>;

    /// Produce a read-only URL for `key` that stops working after `ttl`.
    async fn access_url(&self, key: &str, ttl: Duration) -> AppResult<String>;
}
