//! # stationcast-storage
//!
//! Artifact storage for Stationcast: the local filesystem provider with
//! HMAC-signed, time-limited access URLs, an optional S3-compatible provider,
//! and the [`ResultsReader`] that turns a job's artifacts into URLs.

pub mod manager;
pub mod providers;
pub mod results;
pub mod signing;

pub use manager::ArtifactStoreManager;
pub use results::ResultsReader;
pub use signing::UrlSigner;
