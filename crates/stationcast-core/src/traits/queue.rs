//! Command transport trait.

use async_trait::async_trait;

use crate::result::AppResult;

/// One delivery of a queued command.
///
/// The same command may be delivered more than once; a delivery that is
/// never acknowledged becomes visible again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Queue the command was received from.
    pub queue: String,
    /// Transport-encoded command body.
    pub body: String,
    /// How many times this message has been handed out, starting at 1.
    pub attempt: u32,
    /// Opaque handle used to acknowledge this delivery.
    pub receipt: String,
}

/// At-least-once, unordered command transport.
#[async_trait]
pub trait CommandQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Return the transport type name (e.g., "memory", "redis").
    fn transport_type(&self) -> &str;

    /// Publish an encoded command.
    async fn publish(&self, queue: &str, body: String) -> AppResult<()>;

    /// Take the next visible command, if any.
    async fn receive(&self, queue: &str) -> AppResult<Option<Delivery>>;

    /// Acknowledge a delivery so it is not redelivered.
    async fn ack(&self, delivery: &Delivery) -> AppResult<()>;
}
