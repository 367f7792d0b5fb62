//! Local filesystem artifact store.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use stationcast_core::error::{AppError, ErrorKind};
use stationcast_core::result::AppResult;
use stationcast_core::traits::storage::{ArtifactMeta, ArtifactStore};

use crate::signing::UrlSigner;

/// Marker in the names of in-flight temporary files.
const TEMP_MARKER: &str = ".tmp-";

/// Artifact store rooted at a local directory.
///
/// Access URLs point back at this service's `/artifacts` route and are
/// signed with the configured [`UrlSigner`].
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    /// Root directory for all stored artifacts.
    root: PathBuf,
    /// Signs access URLs.
    signer: UrlSigner,
}

impl LocalArtifactStore {
    /// Create a store rooted at `root_path`, creating the directory if needed.
    pub async fn new(root_path: &str, signer: UrlSigner) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create artifact root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root, signer })
    }

    /// Resolve a key to a path inside the root, refusing anything that
    /// could escape it.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !clean {
            return Err(AppError::validation(format!("Invalid artifact key: {key}")));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Key of `path` relative to the root, with `/` separators.
    fn key_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let full_path = self.resolve(key)?;
        self.ensure_parent(&full_path).await?;

        // Write next to the target and rename so readers never see a
        // partial artifact.
        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(format!("{TEMP_MARKER}{}", Uuid::new_v4().simple()));
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write artifact: {key}"),
                e,
            )
        })?;
        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to move artifact into place: {key}"),
                e,
            ));
        }

        debug!(key, content_type, bytes = data.len(), "Stored artifact");
        Ok(())
    }

    async fn read_bytes(&self, key: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(key)?;
        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Artifact not found: {key}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read artifact: {key}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<ArtifactMeta>> {
        // Only the directory part of the prefix needs walking.
        let dir_part = prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir_part)?
        };

        let mut entries = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut reader = match fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to list directory: {}", dir.display()),
                        e,
                    ));
                }
            };

            while let Some(entry) = reader.next_entry().await? {
                let meta = entry.metadata().await?;
                let path = entry.path();
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(key) = self.key_of(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) || key.contains(TEMP_MARKER) {
                    continue;
                }
                entries.push(ArtifactMeta {
                    key,
                    size_bytes: meta.len(),
                    last_modified: meta.modified().ok().map(chrono::DateTime::<Utc>::from),
                });
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn access_url(&self, key: &str, ttl: Duration) -> AppResult<String> {
        self.resolve(key)?;
        self.signer.signed_url(key, ttl, Utc::now())
    }
}
