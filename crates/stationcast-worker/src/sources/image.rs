//! Image API client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;

use stationcast_core::config::feed::ImageConfig;
use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::source::{FetchedImage, ImageSource};
use stationcast_core::types::ItemKey;

use super::{build_client, ensure_success, request_failed};

/// Fetches one background image per item, seeded by the item key so the
/// same item always gets the same picture.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpImageSource {
    /// Create a client for the configured image endpoint.
    pub fn new(config: &ImageConfig) -> AppResult<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            AppError::configuration(format!("Invalid image endpoint '{}': {e}", config.endpoint))
        })?;
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            endpoint,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_image(
        &self,
        item_key: &ItemKey,
        _item: &serde_json::Value,
    ) -> AppResult<FetchedImage> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("seed", item_key.as_str());

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| request_failed("Image API", e))?;
        let response = ensure_success("Image API", response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| request_failed("Image API body", e))?;
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}
