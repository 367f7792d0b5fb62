//! In-process command queue with visibility-timeout redelivery.
//!
//! A received message stays parked until it is acknowledged. If the
//! acknowledgement does not arrive within the visibility timeout the message
//! becomes receivable again with a higher attempt number.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use stationcast_core::result::AppResult;
use stationcast_core::traits::queue::{CommandQueue, Delivery};

#[derive(Debug, Clone)]
struct Message {
    body: String,
    attempt: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Message>,
    in_flight: HashMap<String, (Message, Instant)>,
}

impl QueueState {
    /// Move every in-flight message whose deadline has passed back to the
    /// front of the ready list.
    fn requeue_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();
        for receipt in expired {
            if let Some((message, _)) = self.in_flight.remove(&receipt) {
                self.ready.push_front(message);
            }
        }
    }
}

/// In-memory command queue.
#[derive(Debug, Clone)]
pub struct MemoryCommandQueue {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
    visibility_timeout: Duration,
}

impl MemoryCommandQueue {
    /// Create an empty queue set.
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            visibility_timeout,
        }
    }

    /// Messages in `queue` that have not been acknowledged yet.
    pub async fn pending(&self, queue: &str) -> usize {
        let queues = self.queues.lock().await;
        queues
            .get(queue)
            .map(|q| q.ready.len() + q.in_flight.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CommandQueue for MemoryCommandQueue {
    fn transport_type(&self) -> &str {
        "memory"
    }

    async fn publish(&self, queue: &str, body: String) -> AppResult<()> {
        let mut queues = self.queues.lock().await;
        queues
            .entry(queue.to_string())
            .or_default()
            .ready
            .push_back(Message { body, attempt: 0 });
        Ok(())
    }

    async fn receive(&self, queue: &str) -> AppResult<Option<Delivery>> {
        let now = Instant::now();
        let mut queues = self.queues.lock().await;
        let Some(state) = queues.get_mut(queue) else {
            return Ok(None);
        };
        state.requeue_expired(now);

        let Some(mut message) = state.ready.pop_front() else {
            return Ok(None);
        };
        message.attempt += 1;
        let receipt = Uuid::new_v4().to_string();
        let delivery = Delivery {
            queue: queue.to_string(),
            body: message.body.clone(),
            attempt: message.attempt,
            receipt: receipt.clone(),
        };
        state
            .in_flight
            .insert(receipt, (message, now + self.visibility_timeout));
        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> AppResult<()> {
        let mut queues = self.queues.lock().await;
        let removed = queues
            .get_mut(&delivery.queue)
            .and_then(|state| state.in_flight.remove(&delivery.receipt));
        if removed.is_none() {
            // Visibility expired first; the message was already handed out again.
            debug!(queue = %delivery.queue, attempt = delivery.attempt, "Late acknowledgement ignored");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_then_ack_removes_message() {
        let queue = MemoryCommandQueue::new(Duration::from_secs(30));
        queue.publish("q", "one".to_string()).await.unwrap();

        let delivery = queue.receive("q").await.unwrap().unwrap();
        assert_eq!(delivery.body, "one");
        assert_eq!(delivery.attempt, 1);
        assert!(queue.receive("q").await.unwrap().is_none());

        queue.ack(&delivery).await.unwrap();
        assert_eq!(queue.pending("q").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacked_message_is_redelivered_after_timeout() {
        let queue = MemoryCommandQueue::new(Duration::from_secs(30));
        queue.publish("q", "one".to_string()).await.unwrap();

        let first = queue.receive("q").await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(queue.receive("q").await.unwrap().is_none());

        tokio::time::advance(Duration::from_secs(25)).await;
        let second = queue.receive("q").await.unwrap().unwrap();
        assert_eq!(second.body, "one");
        assert_eq!(second.attempt, 2);
        assert_ne!(second.receipt, first.receipt);

        // The stale receipt no longer holds the message.
        queue.ack(&first).await.unwrap();
        assert_eq!(queue.pending("q").await, 1);
        queue.ack(&second).await.unwrap();
        assert_eq!(queue.pending("q").await, 0);
    }

    #[tokio::test]
    async fn test_queues_are_independent() {
        let queue = MemoryCommandQueue::new(Duration::from_secs(30));
        queue.publish("a", "x".to_string()).await.unwrap();
        assert!(queue.receive("b").await.unwrap().is_none());
        assert!(queue.receive("a").await.unwrap().is_some());
    }
}
