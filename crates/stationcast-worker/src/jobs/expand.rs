//! Snapshot expansion: one start command in, one work command per record out.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use stationcast_core::config::feed::FeedConfig;
use stationcast_core::traits::queue::Delivery;
use stationcast_core::traits::source::SnapshotSource;
use stationcast_core::types::{ItemKey, StartCommand, TotalOutcome, WorkCommand, decode_command};
use stationcast_status::StatusStore;

use super::classify;
use crate::executor::{CommandHandler, JobExecutionError};
use crate::queue::CommandQueueManager;

/// Paths at which the record list may sit inside a snapshot, tried in order.
pub const SNAPSHOT_SHAPES: [&[&str]; 2] = [&["actual", "stationmeasurements"], &["stationmeasurements"]];

/// Find the record list using the first matching shape.
pub fn locate_records(snapshot: &Value) -> Option<&Vec<Value>> {
    SNAPSHOT_SHAPES.iter().find_map(|path| {
        path.iter()
            .try_fold(snapshot, |node, segment| node.get(segment))
            .and_then(Value::as_array)
    })
}

/// Work items derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Valid items in snapshot order.
    pub items: Vec<(ItemKey, Value)>,
    /// Records that were not objects or had no usable key.
    pub malformed: usize,
    /// Records whose key repeated an earlier record's key.
    pub duplicates: usize,
}

/// Derive work items from at most `max_fan_out` records.
///
/// Truncation happens before validation, so the fan-out bound holds on the
/// raw list. Malformed records and repeated keys are skipped individually.
pub fn derive_items(records: &[Value], key_field: &str, max_fan_out: usize) -> Expansion {
    let mut expansion = Expansion::default();
    let mut seen = HashSet::new();
    for (index, record) in records.iter().take(max_fan_out).enumerate() {
        let key = record
            .as_object()
            .and_then(|fields| fields.get(key_field))
            .and_then(ItemKey::derive);
        let Some(key) = key else {
            warn!(index, key_field, "Skipping record without a usable key");
            expansion.malformed += 1;
            continue;
        };
        if !seen.insert(key.clone()) {
            warn!(index, item_key = %key, "Skipping record with repeated key");
            expansion.duplicates += 1;
            continue;
        }
        expansion.items.push((key, record.clone()));
    }
    expansion
}

/// Handles start commands: fetch the snapshot, record the total, fan out.
#[derive(Debug)]
pub struct FeedExpander {
    status: StatusStore,
    queues: CommandQueueManager,
    source: Arc<dyn SnapshotSource>,
    config: FeedConfig,
}

impl FeedExpander {
    /// Create an expander.
    pub fn new(
        status: StatusStore,
        queues: CommandQueueManager,
        source: Arc<dyn SnapshotSource>,
        config: FeedConfig,
    ) -> Self {
        Self {
            status,
            queues,
            source,
            config,
        }
    }
}

#[async_trait]
impl CommandHandler for FeedExpander {
    fn name(&self) -> &str {
        "feed-expander"
    }

    async fn handle(&self, delivery: &Delivery) -> Result<(), JobExecutionError> {
        let command: StartCommand = decode_command(&delivery.body).map_err(|e| {
            error!(error = %e, "Undecodable start command");
            JobExecutionError::Drop(e.to_string())
        })?;
        let job_id = command.job_id;

        // Unknown jobs are dropped before spending a fetch on them.
        self.status.get(&job_id).await.map_err(classify)?;

        let snapshot = self.source.fetch_snapshot().await.map_err(|e| {
            error!(job_id = %job_id, attempt = delivery.attempt, error = %e, "Snapshot fetch failed");
            JobExecutionError::Transient(e.to_string())
        })?;

        let Some(records) = locate_records(&snapshot) else {
            error!(job_id = %job_id, "Snapshot matched no known shape");
            return Err(JobExecutionError::Drop(format!(
                "snapshot for job {job_id} contains no record list"
            )));
        };

        let expansion = derive_items(records, &self.config.item_key_field, self.config.max_fan_out);
        let total = u32::try_from(expansion.items.len())
            .map_err(|_| JobExecutionError::Drop("fan-out exceeds u32".to_string()))?;

        match self.status.set_total_if_unset(&job_id, total).await {
            Ok(TotalOutcome::Set(_)) => info!(
                job_id = %job_id,
                total,
                available = records.len(),
                malformed = expansion.malformed,
                duplicates = expansion.duplicates,
                "Recorded job total"
            ),
            Ok(TotalOutcome::AlreadySet(_)) => info!(
                job_id = %job_id,
                total,
                attempt = delivery.attempt,
                "Total already recorded, republishing work commands"
            ),
            Err(e) => {
                error!(job_id = %job_id, total, error = %e, "Could not record job total");
                return Err(classify(e));
            }
        }

        for (item_key, item) in expansion.items {
            self.queues
                .publish_work(&WorkCommand {
                    job_id: job_id.clone(),
                    item_key: Some(item_key),
                    item,
                })
                .await?;
        }

        info!(job_id = %job_id, total, "Expanded job");
        Ok(())
    }
}
