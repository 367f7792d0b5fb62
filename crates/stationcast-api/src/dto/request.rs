//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::types::JobId;
use stationcast_core::types::id::MAX_ID_LENGTH;

/// `?jobId=` query used by the status and results endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct JobQuery {
    /// Job to look up.
    #[serde(rename = "jobId")]
    #[validate(
        required(message = "jobId query parameter is required"),
        length(min = 1, max = 128, message = "jobId must be 1-128 characters")
    )]
    pub job_id: Option<String>,
}

impl JobQuery {
    /// Validate and parse the job id.
    pub fn job_id(&self) -> AppResult<JobId> {
        self.validate()
            .map_err(|e| AppError::validation(validation_message(&e)))?;
        match &self.job_id {
            Some(raw) => JobId::parse(raw.as_str()),
            None => Err(AppError::validation("jobId query parameter is required")),
        }
    }
}

/// Optional caller-supplied id for `/start`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StartQuery {
    /// Requested job id; generated when absent.
    #[serde(rename = "jobId")]
    #[validate(length(min = 1, max = 128, message = "jobId must be 1-128 characters"))]
    pub job_id: Option<String>,
}

impl StartQuery {
    /// Validate and parse the requested id, if any.
    pub fn requested_id(&self) -> AppResult<Option<JobId>> {
        self.validate()
            .map_err(|e| AppError::validation(validation_message(&e)))?;
        self.job_id.as_deref().map(JobId::parse).transpose()
    }
}

/// Query parameters carried by a signed artifact link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactQuery {
    /// Expiry, unix seconds.
    pub expires: Option<String>,
    /// Hex HMAC signature.
    pub signature: Option<String>,
}

impl ArtifactQuery {
    /// Expiry and signature, or `None` when either is absent or unparsable.
    pub fn credentials(&self) -> Option<(i64, &str)> {
        let expires = self.expires.as_deref()?.parse().ok()?;
        Some((expires, self.signature.as_deref()?))
    }
}

/// First human-readable message out of a validation failure.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| format!("invalid query (ids are at most {MAX_ID_LENGTH} characters)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stationcast_core::error::ErrorKind;

    #[test]
    fn test_missing_job_id_is_validation_error() {
        let err = JobQuery::default().job_id().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("required"));
    }

    #[test]
    fn test_job_id_is_parsed() {
        let q = JobQuery {
            job_id: Some("abc".to_string()),
        };
        assert_eq!(q.job_id().unwrap().as_str(), "abc");
        let bad = JobQuery {
            job_id: Some("a/b".to_string()),
        };
        assert_eq!(bad.job_id().unwrap_err().kind, ErrorKind::Validation);
    }

    #[test]
    fn test_start_query_is_optional() {
        assert!(StartQuery::default().requested_id().unwrap().is_none());
        let q = StartQuery {
            job_id: Some(String::new()),
        };
        assert!(q.requested_id().is_err());
    }
}
