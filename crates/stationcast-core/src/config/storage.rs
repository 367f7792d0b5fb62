//! Artifact storage configuration.

use serde::{Deserialize, Serialize};

/// Top-level artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider: `"local"` or `"s3"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Root path for local artifact storage.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Secret used to sign time-limited artifact URLs (local provider).
    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,
    /// Validity of generated access URLs in seconds.
    #[serde(default = "default_url_ttl")]
    pub url_ttl_seconds: u64,
    /// File extension of rendered artifacts.
    #[serde(default = "default_extension")]
    pub artifact_extension: String,
    /// S3-compatible storage configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            root_path: default_root_path(),
            signing_secret: default_signing_secret(),
            url_ttl_seconds: default_url_ttl(),
            artifact_extension: default_extension(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// S3 endpoint URL (for non-AWS services like MinIO). Empty for AWS.
    #[serde(default)]
    pub endpoint: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// S3 bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Access key ID. Empty to use the default credential chain.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            bucket: default_bucket(),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_root_path() -> String {
    "./data/artifacts".to_string()
}

fn default_signing_secret() -> String {
    "change-me".to_string()
}

fn default_url_ttl() -> u64 {
    3600
}

fn default_extension() -> String {
    "png".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket() -> String {
    "generated-images".to_string()
}
