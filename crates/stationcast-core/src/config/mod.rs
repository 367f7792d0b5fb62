//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and each component receives only its own section at
//! construction time.

pub mod app;
pub mod feed;
pub mod logging;
pub mod queue;
pub mod status;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::feed::{FeedConfig, ImageConfig};
pub use self::logging::LoggingConfig;
pub use self::queue::{QueueConfig, RedisQueueConfig};
pub use self::status::{RedisStatusConfig, StatusConfig};
pub use self::storage::{S3StorageConfig, StorageConfig};
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Job status store settings.
    #[serde(default)]
    pub status: StatusConfig,
    /// Artifact storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Command transport settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// External snapshot feed settings.
    #[serde(default)]
    pub feed: FeedConfig,
    /// External image API settings.
    #[serde(default)]
    pub image: ImageConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `STATIONCAST__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("STATIONCAST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
