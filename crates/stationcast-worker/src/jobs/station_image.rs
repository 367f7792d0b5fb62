//! Per-item processing: fetch, render, store, count.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use stationcast_core::traits::queue::Delivery;
use stationcast_core::traits::source::ImageSource;
use stationcast_core::types::{IncrementOutcome, ItemKey, WorkCommand, decode_command};
use stationcast_status::StatusStore;
use stationcast_storage::ArtifactStoreManager;

use super::classify;
use crate::executor::{CommandHandler, JobExecutionError};
use crate::render::{ARTIFACT_CONTENT_TYPE, render_station_image};

/// Handles work commands for station records.
///
/// A failed image fetch drops the item: no artifact is written and the job's
/// counter is not touched, so the job stays `processing`.
#[derive(Debug)]
pub struct StationImageWorker {
    status: StatusStore,
    artifacts: ArtifactStoreManager,
    images: Arc<dyn ImageSource>,
    /// Record field the item key is derived from when a command omits it.
    item_key_field: String,
}

impl StationImageWorker {
    /// Create a worker.
    pub fn new(
        status: StatusStore,
        artifacts: ArtifactStoreManager,
        images: Arc<dyn ImageSource>,
        item_key_field: impl Into<String>,
    ) -> Self {
        Self {
            status,
            artifacts,
            images,
            item_key_field: item_key_field.into(),
        }
    }

    /// The command's item key, or one derived from the record.
    fn resolve_item_key(&self, command: &WorkCommand) -> Option<ItemKey> {
        command.item_key.clone().or_else(|| {
            command
                .item
                .get(&self.item_key_field)
                .and_then(ItemKey::derive)
        })
    }
}

#[async_trait]
impl CommandHandler for StationImageWorker {
    fn name(&self) -> &str {
        "station-image"
    }

    async fn handle(&self, delivery: &Delivery) -> Result<(), JobExecutionError> {
        let command: WorkCommand = decode_command(&delivery.body).map_err(|e| {
            error!(error = %e, "Undecodable work command");
            JobExecutionError::Drop(e.to_string())
        })?;
        let Some(item_key) = self.resolve_item_key(&command) else {
            error!(
                job_id = %command.job_id,
                key_field = %self.item_key_field,
                "Work command has no usable item key"
            );
            return Err(JobExecutionError::Drop(format!(
                "work command for job {} has no usable item key",
                command.job_id
            )));
        };
        let WorkCommand { job_id, item, .. } = command;

        // Unknown jobs are dropped before anything is fetched or written.
        self.status.get(&job_id).await.map_err(classify)?;

        let fetched = self.images.fetch_image(&item_key, &item).await.map_err(|e| {
            error!(
                job_id = %job_id,
                item_key = %item_key,
                attempt = delivery.attempt,
                error = %e,
                "Image fetch failed, dropping item"
            );
            JobExecutionError::Drop(e.to_string())
        })?;

        let rendered = tokio::task::spawn_blocking(move || render_station_image(&fetched.bytes, &item))
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Render task failed: {e}")))?
            .map_err(|e| {
                error!(job_id = %job_id, item_key = %item_key, error = %e, "Render failed, dropping item");
                JobExecutionError::Drop(e.to_string())
            })?;

        let key = self.artifacts.artifact_key(&job_id, &item_key);
        self.artifacts
            .store()
            .put(&key, rendered, ARTIFACT_CONTENT_TYPE)
            .await?;

        match self.status.increment_completed(&job_id, &item_key).await {
            Ok(IncrementOutcome::Counted(record)) => info!(
                job_id = %job_id,
                item_key = %item_key,
                completed = record.completed_count,
                total = ?record.total_expected,
                status = %record.status,
                "Item completed"
            ),
            Ok(IncrementOutcome::AlreadyCounted(_)) => info!(
                job_id = %job_id,
                item_key = %item_key,
                attempt = delivery.attempt,
                "Item already counted, artifact refreshed"
            ),
            Err(e) => {
                error!(job_id = %job_id, item_key = %item_key, error = %e, "Could not count item");
                return Err(classify(e));
            }
        }
        Ok(())
    }
}
