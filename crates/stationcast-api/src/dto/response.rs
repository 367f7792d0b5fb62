//! Response DTOs.

use serde::{Deserialize, Serialize};

use stationcast_core::types::{JobId, JobStatus};

/// Body of `/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Id of the new job.
    pub job_id: JobId,
    /// Always `queued`.
    pub status: JobStatus,
}

/// Body of `/results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    /// Job the results belong to.
    pub job_id: JobId,
    /// Time-limited artifact URLs, ordered by artifact key.
    pub images: Vec<String>,
}

/// Body of `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Whether the status backend answered.
    pub status_backend: bool,
    /// Whether the artifact store answered.
    pub artifact_store: bool,
}
