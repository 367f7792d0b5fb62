//! Artifact store manager: selects and holds the configured provider.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use stationcast_core::config::storage::StorageConfig;
use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::storage::ArtifactStore;
use stationcast_core::types::{ItemKey, JobId};

use crate::providers::LocalArtifactStore;
use crate::signing::UrlSigner;

/// Holds the active artifact store together with the settings every caller
/// of it needs (artifact extension, URL lifetime).
#[derive(Debug, Clone)]
pub struct ArtifactStoreManager {
    store: Arc<dyn ArtifactStore>,
    extension: String,
    url_ttl: Duration,
}

impl ArtifactStoreManager {
    /// Build the provider named by `config.provider`.
    pub async fn new(config: &StorageConfig, signer: UrlSigner) -> AppResult<Self> {
        let store: Arc<dyn ArtifactStore> = match config.provider.as_str() {
            "local" => {
                info!(root = %config.root_path, "Initializing local artifact store");
                Arc::new(LocalArtifactStore::new(&config.root_path, signer).await?)
            }
            #[cfg(feature = "s3")]
            "s3" => Arc::new(crate::providers::S3ArtifactStore::new(&config.s3).await?),
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider: '{other}'. Supported: local{}",
                    if cfg!(feature = "s3") { ", s3" } else { "" }
                )));
            }
        };
        Ok(Self::from_store(store, config))
    }

    /// Wrap an existing store (for testing).
    pub fn from_store(store: Arc<dyn ArtifactStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            extension: config.artifact_extension.clone(),
            url_ttl: Duration::from_secs(config.url_ttl_seconds),
        }
    }

    /// The active store.
    pub fn store(&self) -> Arc<dyn ArtifactStore> {
        Arc::clone(&self.store)
    }

    /// Lifetime of generated access URLs.
    pub fn url_ttl(&self) -> Duration {
        self.url_ttl
    }

    /// Key for one item's artifact.
    pub fn artifact_key(&self, job_id: &JobId, item_key: &ItemKey) -> String {
        stationcast_core::traits::storage::artifact_key(job_id, item_key, &self.extension)
    }

    /// Check that the store is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }
}
