//! Job status store configuration.

use serde::{Deserialize, Serialize};

/// Top-level status store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Backend type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Conditional-update attempts before falling back to the atomic increment.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Seconds without progress after which a processing job reads as stalled.
    /// `0` disables the stalled view.
    #[serde(default)]
    pub stall_after_seconds: u64,
    /// Redis-specific configuration.
    #[serde(default)]
    pub redis: RedisStatusConfig,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            retry_budget: default_retry_budget(),
            stall_after_seconds: 0,
            redis: RedisStatusConfig::default(),
        }
    }
}

/// Redis status backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStatusConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all Stationcast status keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Per-command response timeout in seconds.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_seconds: u64,
}

impl Default for RedisStatusConfig {
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

fn default_retry_budget() -> u32 {
    5
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "stationcast:".to_string()
}

fn default_response_timeout() -> u64 {
    5
}
