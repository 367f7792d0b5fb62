//! Command transport configuration.

use serde::{Deserialize, Serialize};

/// Command queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Transport type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Queue carrying start commands.
    #[serde(default = "default_start_queue")]
    pub start_queue: String,
    /// Queue carrying per-item work commands.
    #[serde(default = "default_work_queue")]
    pub work_queue: String,
    /// Seconds an un-acknowledged delivery stays hidden before redelivery.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: u64,
    /// Deliveries of one command before a transient failure is given up on.
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,
    /// Redis transport configuration.
    #[serde(default)]
    pub redis: RedisQueueConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            start_queue: default_start_queue(),
            work_queue: default_work_queue(),
            visibility_timeout_seconds: default_visibility_timeout(),
            max_deliveries: default_max_deliveries(),
            redis: RedisQueueConfig::default(),
        }
    }
}

/// Redis-backed queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisQueueConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for queue lists.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Upper bound on a single Redis round trip, in seconds.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_seconds: u64,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            response_timeout_seconds: default_response_timeout(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_start_queue() -> String {
    "start-queue".to_string()
}

fn default_work_queue() -> String {
    "image-queue".to_string()
}

fn default_visibility_timeout() -> u64 {
    60
}

fn default_max_deliveries() -> u32 {
    5
}

fn default_response_timeout() -> u64 {
    5
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "stationcast:queue:".to_string()
}
