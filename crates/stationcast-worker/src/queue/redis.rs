//! Redis command queue built on reliable lists.
//!
//! Layout per queue name `q` (all under the configured prefix):
//! - `q` ready list, producers `LPUSH`, consumers take from the right;
//! - `q:processing` list of messages handed out but not acknowledged;
//! - `q:deadlines` sorted set scoring each in-flight message by the time
//!   (unix millis) it becomes visible again.
//!
//! Messages are stored as a small JSON envelope carrying a unique id and the
//! attempt counter, so identical bodies never collide in the processing list.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::Script;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use stationcast_core::config::queue::RedisQueueConfig;
use stationcast_core::error::{AppError, ErrorKind};
use stationcast_core::result::AppResult;
use stationcast_core::traits::queue::{CommandQueue, Delivery};

/// KEYS: ready, processing, deadlines. ARGV: now millis, visibility millis.
/// Returns the in-flight envelope or nil.
const RECEIVE: &str = r#"
local expired = redis.call('ZRANGEBYSCORE', KEYS[3], '-inf', ARGV[1])
for _, member in ipairs(expired) do
  redis.call('LREM', KEYS[2], 1, member)
  redis.call('ZREM', KEYS[3], member)
  redis.call('RPUSH', KEYS[1], member)
end
local raw = redis.call('RPOP', KEYS[1])
if not raw then return false end
local envelope = cjson.decode(raw)
envelope['attempt'] = tonumber(envelope['attempt']) + 1
local parked = cjson.encode(envelope)
redis.call('LPUSH', KEYS[2], parked)
redis.call('ZADD', KEYS[3], tonumber(ARGV[1]) + tonumber(ARGV[2]), parked)
return parked
"#;

/// KEYS: processing, deadlines. ARGV: parked envelope.
const ACK: &str = r#"
redis.call('ZREM', KEYS[2], ARGV[1])
return redis.call('LREM', KEYS[1], 1, ARGV[1])
"#;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    id: String,
    attempt: u32,
    body: String,
}

/// Redis-backed command queue.
#[derive(Clone)]
pub struct RedisCommandQueue {
    conn: ConnectionManager,
    key_prefix: String,
    visibility_timeout: Duration,
    response_timeout: Duration,
    receive_script: Script,
    ack_script: Script,
}

impl std::fmt::Debug for RedisCommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCommandQueue")
            .field("key_prefix", &self.key_prefix)
            .field("visibility_timeout", &self.visibility_timeout)
            .finish()
    }
}

impl RedisCommandQueue {
    /// Connect to Redis.
    pub async fn connect(config: &RedisQueueConfig, visibility_timeout: Duration) -> AppResult<Self> {
        info!(url = %stationcast_status::redis::mask_redis_url(&config.url), "Connecting command queue to Redis");
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Queue, "Failed to create Redis client", e)
        })?;
        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::Queue, "Failed to connect to Redis", e)
        })?;
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            visibility_timeout,
            response_timeout: Duration::from_secs(config.response_timeout_seconds),
            receive_script: Script::new(RECEIVE),
            ack_script: Script::new(ACK),
        })
    }

    fn ready_key(&self, queue: &str) -> String {
        format!("{}{queue}", self.key_prefix)
    }

    fn processing_key(&self, queue: &str) -> String {
        format!("{}{queue}:processing", self.key_prefix)
    }

    fn deadlines_key(&self, queue: &str) -> String {
        format!("{}{queue}:deadlines", self.key_prefix)
    }

    async fn bounded<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.response_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::with_source(
                ErrorKind::Queue,
                format!("Redis error: {e}"),
                e,
            )),
            Err(_) => Err(AppError::queue(format!(
                "Redis call timed out after {}s",
                self.response_timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl CommandQueue for RedisCommandQueue {
    fn transport_type(&self) -> &str {
        "redis"
    }

    async fn publish(&self, queue: &str, body: String) -> AppResult<()> {
        let envelope = serde_json::to_string(&Envelope {
            id: Uuid::new_v4().to_string(),
            attempt: 0,
            body,
        })?;
        let mut conn = self.conn.clone();
        let _: i64 = self
            .bounded(
                redis::cmd("LPUSH")
                    .arg(self.ready_key(queue))
                    .arg(envelope)
                    .query_async(&mut conn),
            )
            .await?;
        debug!(queue, "Published command");
        Ok(())
    }

    async fn receive(&self, queue: &str) -> AppResult<Option<Delivery>> {
        let mut conn = self.conn.clone();
        let mut invocation = self.receive_script.key(self.ready_key(queue));
        invocation
            .key(self.processing_key(queue))
            .key(self.deadlines_key(queue))
            .arg(Utc::now().timestamp_millis())
            .arg(self.visibility_timeout.as_millis() as i64);
        let parked: Option<String> = self.bounded(invocation.invoke_async(&mut conn)).await?;

        let Some(parked) = parked else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_str(&parked)
            .map_err(|e| AppError::queue(format!("Corrupt queue envelope in {queue}: {e}")))?;
        Ok(Some(Delivery {
            queue: queue.to_string(),
            body: envelope.body,
            attempt: envelope.attempt,
            receipt: parked,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let mut invocation = self.ack_script.key(self.processing_key(&delivery.queue));
        invocation
            .key(self.deadlines_key(&delivery.queue))
            .arg(&delivery.receipt);
        let removed: i64 = self.bounded(invocation.invoke_async(&mut conn)).await?;
        if removed == 0 {
            debug!(queue = %delivery.queue, attempt = delivery.attempt, "Late acknowledgement ignored");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn queue(visibility: Duration) -> RedisCommandQueue {
        let config = RedisQueueConfig {
            url: std::env::var("REDIS_URL").expect("REDIS_URL not set"),
            key_prefix: format!("stationcast-test-{}:", Uuid::new_v4()),
            ..RedisQueueConfig::default()
        };
        RedisCommandQueue::connect(&config, visibility).await.unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires Redis at REDIS_URL
    async fn test_unacked_command_is_redelivered_after_visibility_timeout() {
        let q = queue(Duration::from_millis(50)).await;
        q.publish("work", "payload".to_string()).await.unwrap();

        let first = q.receive("work").await.unwrap().unwrap();
        assert_eq!((first.body.as_str(), first.attempt), ("payload", 1));
        assert!(q.receive("work").await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(120)).await;
        let second = q.receive("work").await.unwrap().unwrap();
        assert_eq!((second.body.as_str(), second.attempt), ("payload", 2));

        // The first receipt is stale; only the second removes the command.
        q.ack(&first).await.unwrap();
        q.ack(&second).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(q.receive("work").await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis at REDIS_URL
    async fn test_commands_are_received_in_publish_order() {
        let q = queue(Duration::from_secs(30)).await;
        for body in ["a", "b", "c"] {
            q.publish("start", body.to_string()).await.unwrap();
        }
        let mut seen = Vec::new();
        while let Some(delivery) = q.receive("start").await.unwrap() {
            q.ack(&delivery).await.unwrap();
            seen.push(delivery.body);
        }
        assert_eq!(seen, ["a", "b", "c"]);
    }
}
