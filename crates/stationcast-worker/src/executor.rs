//! Command handler contract shared by the runners.

use async_trait::async_trait;

use stationcast_core::error::AppError;
use stationcast_core::traits::queue::Delivery;

/// Handles deliveries from one queue.
#[async_trait]
pub trait CommandHandler: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Process one delivery.
    async fn handle(&self, delivery: &Delivery) -> Result<(), JobExecutionError>;
}

/// Error from command execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The delivery can never succeed; acknowledge it without further effect.
    #[error("Dropped: {0}")]
    Drop(String),

    /// The delivery may succeed later; leave it for redelivery.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Infrastructure failure; leave it for redelivery.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Whether the delivery should be acknowledged despite the failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Drop(_))
    }
}
