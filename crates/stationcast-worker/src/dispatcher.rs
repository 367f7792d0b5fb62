//! Job submission.

use tracing::info;

use stationcast_core::result::AppResult;
use stationcast_core::types::{JobId, JobRecord, StartCommand};
use stationcast_status::StatusStore;

use crate::queue::CommandQueueManager;

/// Creates jobs and hands them to the expander.
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    status: StatusStore,
    queues: CommandQueueManager,
}

impl JobDispatcher {
    /// Create a dispatcher.
    pub fn new(status: StatusStore, queues: CommandQueueManager) -> Self {
        Self { status, queues }
    }

    /// Submit a job, using `requested` as its id when given.
    ///
    /// The record is written before the start command is published, so a
    /// failed write never leaves a command for a job that does not exist.
    pub async fn submit(&self, requested: Option<JobId>) -> AppResult<JobRecord> {
        let job_id = requested.unwrap_or_else(JobId::generate);
        let record = self.status.create(&job_id).await?;
        self.queues
            .publish_start(&StartCommand {
                job_id: job_id.clone(),
            })
            .await?;
        info!(job_id = %job_id, "Job submitted");
        Ok(record)
    }
}
