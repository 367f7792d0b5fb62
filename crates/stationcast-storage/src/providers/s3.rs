//! S3-compatible artifact store (requires the `s3` feature).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use stationcast_core::config::storage::S3StorageConfig;
use stationcast_core::error::{AppError, ErrorKind};
use stationcast_core::result::AppResult;
use stationcast_core::traits::storage::{ArtifactMeta, ArtifactStore};

/// Artifact store backed by an S3 bucket. Access URLs are presigned GETs.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
}

impl S3ArtifactStore {
    /// Create a new S3 artifact store.
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 artifact store"
        );

        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let mut builder = Builder::from(&shared);
        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(&config.endpoint).force_path_style(true);
        }
        if !config.access_key.is_empty() {
            builder = builder.credentials_provider(Credentials::new(
                &config.access_key,
                &config.secret_key,
                None,
                None,
                "stationcast-config",
            ));
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }
}

fn s3_error(
    message: String,
    err: impl std::error::Error + Send + Sync + 'static,
) -> AppError {
    AppError::with_source(ErrorKind::Storage, message, err)
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to upload artifact: {key}"), e))?;
        debug!(key, bytes = size, "Uploaded artifact");
        Ok(())
    }

    async fn read_bytes(&self, key: &str) -> AppResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    AppError::not_found(format!("Artifact not found: {key}"))
                } else {
                    s3_error(format!("Failed to download artifact: {key}"), service)
                }
            })?;
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| s3_error(format!("Failed to read artifact body: {key}"), e))?;
        Ok(data.into_bytes())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<ArtifactMeta>> {
        let mut entries = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| s3_error(format!("Failed to list artifacts under {prefix}"), e))?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                entries.push(ArtifactMeta {
                    key: key.to_string(),
                    size_bytes: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: object
                        .last_modified()
                        .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                });
            }

            match page.next_continuation_token() {
                Some(next) if page.is_truncated().unwrap_or(false) => {
                    token = Some(next.to_string());
                }
                _ => break,
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn access_url(&self, key: &str, ttl: Duration) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| s3_error(format!("Invalid presign lifetime for {key}"), e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| s3_error(format!("Failed to presign artifact: {key}"), e))?;
        Ok(request.uri().to_string())
    }
}
