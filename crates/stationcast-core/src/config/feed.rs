//! External data source configuration: the snapshot feed and the image API.

use serde::{Deserialize, Serialize};

/// Snapshot feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// URL of the JSON snapshot.
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Maximum number of work items derived from one snapshot.
    #[serde(default = "default_max_fan_out")]
    pub max_fan_out: usize,
    /// Record field the item key is derived from.
    #[serde(default = "default_item_key_field")]
    pub item_key_field: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            max_fan_out: default_max_fan_out(),
            item_key_field: default_item_key_field(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Image API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Endpoint returning a background image.
    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,
    /// Optional bearer token sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_image_endpoint(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_feed_url() -> String {
    "https://data.buienradar.nl/2.0/feed/json".to_string()
}

fn default_max_fan_out() -> usize {
    50
}

fn default_item_key_field() -> String {
    "stationid".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_image_endpoint() -> String {
    "https://picsum.photos/800/600".to_string()
}
