//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background command worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker runners are started alongside the API.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent command executions per runner.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in milliseconds between polls of an empty queue.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_millis: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            concurrency: default_concurrency(),
            poll_interval_millis: default_poll_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    500
}
