//! Lists a job's artifacts as time-limited URLs.

use futures::future::try_join_all;
use tracing::debug;

use stationcast_core::result::AppResult;
use stationcast_core::traits::storage::job_prefix;
use stationcast_core::types::JobId;

use crate::manager::ArtifactStoreManager;

/// Reads the results of a job out of the artifact store.
///
/// Results are whatever artifacts exist under the job's prefix, regardless of
/// the job's status. A job with no artifacts (or an unknown job) yields an
/// empty list.
#[derive(Debug, Clone)]
pub struct ResultsReader {
    artifacts: ArtifactStoreManager,
}

impl ResultsReader {
    /// Create a reader over the given store.
    pub fn new(artifacts: ArtifactStoreManager) -> Self {
        Self { artifacts }
    }

    /// URLs for every artifact of `job_id`, ordered by artifact key.
    pub async fn list(&self, job_id: &JobId) -> AppResult<Vec<String>> {
        let store = self.artifacts.store();
        let ttl = self.artifacts.url_ttl();
        let entries = store.list(&job_prefix(job_id)).await?;

        let urls = try_join_all(entries.iter().map(|entry| store.access_url(&entry.key, ttl))).await?;
        debug!(job_id = %job_id, count = urls.len(), "Listed job results");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bytes::Bytes;
    use stationcast_core::config::storage::StorageConfig;

    use crate::providers::LocalArtifactStore;
    use crate::signing::UrlSigner;

    async fn reader() -> (tempfile::TempDir, ArtifactStoreManager, ResultsReader) {
        let dir = tempfile::TempDir::new().unwrap();
        let signer = UrlSigner::new("k", "http://h").unwrap();
        let store = LocalArtifactStore::new(dir.path().to_str().unwrap(), signer)
            .await
            .unwrap();
        let manager = ArtifactStoreManager::from_store(Arc::new(store), &StorageConfig::default());
        (dir, manager.clone(), ResultsReader::new(manager))
    }

    #[tokio::test]
    async fn test_lists_urls_in_key_order() {
        let (_dir, manager, reader) = reader().await;
        let store = manager.store();
        for key in ["job-1/b.png", "job-1/a.png", "job-2/c.png"] {
            store.put(key, Bytes::from_static(b"x"), "image/png").await.unwrap();
        }

        let urls = reader.list(&JobId::parse("job-1").unwrap()).await.unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("http://h/artifacts/job-1/a.png?"));
        assert!(urls[1].starts_with("http://h/artifacts/job-1/b.png?"));
    }

    #[tokio::test]
    async fn test_job_without_artifacts_is_empty() {
        let (_dir, _manager, reader) = reader().await;
        let urls = reader.list(&JobId::parse("ghost").unwrap()).await.unwrap();
        assert!(urls.is_empty());
    }
}
