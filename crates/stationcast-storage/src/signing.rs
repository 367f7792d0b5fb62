//! HMAC-SHA256 signing of time-limited artifact URLs.
//!
//! A signed URL looks like
//! `{base}/artifacts/{key}?expires=<unix seconds>&signature=<hex>` where the
//! signature covers `"{key}:{expires}"`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;

type HmacSha256 = Hmac<Sha256>;

/// Path segment the artifact route is mounted under.
pub const ARTIFACT_ROUTE: &str = "/artifacts";

/// Signs and verifies artifact URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    base_url: String,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    /// Create a signer for URLs rooted at `base_url`.
    pub fn new(secret: &str, base_url: &str) -> AppResult<Self> {
        if secret.is_empty() {
            return Err(AppError::configuration("storage.signing_secret must not be empty"));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn mac(&self, key: &str, expires: i64) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::internal(format!("Invalid signing key: {e}")))?;
        mac.update(format!("{key}:{expires}").as_bytes());
        Ok(mac)
    }

    /// Hex signature for `key` valid until `expires` (unix seconds).
    pub fn signature(&self, key: &str, expires: i64) -> AppResult<String> {
        Ok(hex::encode(self.mac(key, expires)?.finalize().into_bytes()))
    }

    /// Build a URL for `key` that stops verifying after `ttl`.
    pub fn signed_url(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> AppResult<String> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::configuration(format!("URL lifetime out of range: {e}")))?;
        let expires = (now + ttl).timestamp();
        let signature = self.signature(key, expires)?;
        Ok(format!(
            "{}{ARTIFACT_ROUTE}/{key}?expires={expires}&signature={signature}",
            self.base_url
        ))
    }

    /// Check a presented signature. Fails with `Forbidden` when the
    /// signature does not match or the URL has expired.
    pub fn verify(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let presented = hex::decode(signature)
            .map_err(|_| AppError::forbidden("Malformed artifact signature"))?;
        self.mac(key, expires)?
            .verify_slice(&presented)
            .map_err(|_| AppError::forbidden("Invalid artifact signature"))?;
        if now.timestamp() > expires {
            return Err(AppError::forbidden("Artifact link has expired"));
        }
        Ok(())
    }
}
