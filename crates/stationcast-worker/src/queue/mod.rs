//! Command queues and the manager that selects one from configuration.

pub mod memory;
#[cfg(feature = "redis-queue")]
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use stationcast_core::config::queue::QueueConfig;
use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::queue::CommandQueue;
use stationcast_core::types::{StartCommand, WorkCommand, encode_command};

pub use memory::MemoryCommandQueue;
#[cfg(feature = "redis-queue")]
pub use self::redis::RedisCommandQueue;

/// Holds the active transport and the names of the two command queues.
#[derive(Debug, Clone)]
pub struct CommandQueueManager {
    inner: Arc<dyn CommandQueue>,
    start_queue: String,
    work_queue: String,
    max_deliveries: u32,
}

impl CommandQueueManager {
    /// Build the transport named by `config.provider`.
    pub async fn new(config: &QueueConfig) -> AppResult<Self> {
        let visibility = Duration::from_secs(config.visibility_timeout_seconds);
        let inner: Arc<dyn CommandQueue> = match config.provider.as_str() {
            "memory" => {
                info!("Initializing in-memory command queue");
                Arc::new(MemoryCommandQueue::new(visibility))
            }
            #[cfg(feature = "redis-queue")]
            "redis" => Arc::new(RedisCommandQueue::connect(&config.redis, visibility).await?),
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown queue provider: '{other}'. Supported: memory, redis"
                )));
            }
        };
        Ok(Self::from_queue(inner, config))
    }

    /// Wrap an existing transport (for testing).
    pub fn from_queue(queue: Arc<dyn CommandQueue>, config: &QueueConfig) -> Self {
        Self {
            inner: queue,
            start_queue: config.start_queue.clone(),
            work_queue: config.work_queue.clone(),
            max_deliveries: config.max_deliveries.max(1),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> Arc<dyn CommandQueue> {
        Arc::clone(&self.inner)
    }

    /// Name of the queue carrying start commands.
    pub fn start_queue(&self) -> &str {
        &self.start_queue
    }

    /// Name of the queue carrying work commands.
    pub fn work_queue(&self) -> &str {
        &self.work_queue
    }

    /// Deliveries after which a transiently failing command is abandoned.
    pub fn max_deliveries(&self) -> u32 {
        self.max_deliveries
    }

    /// Publish a start command.
    pub async fn publish_start(&self, command: &StartCommand) -> AppResult<()> {
        self.inner
            .publish(&self.start_queue, encode_command(command)?)
            .await?;
        debug!(job_id = %command.job_id, queue = %self.start_queue, "Published start command");
        Ok(())
    }

    /// Publish a work command.
    pub async fn publish_work(&self, command: &WorkCommand) -> AppResult<()> {
        self.inner
            .publish(&self.work_queue, encode_command(command)?)
            .await?;
        debug!(
            job_id = %command.job_id,
            item_key = ?command.item_key.as_ref().map(|k| k.as_str()),
            queue = %self.work_queue,
            "Published work command"
        );
        Ok(())
    }
}
