//! Key builders for status entries.
//!
//! The Redis client prepends its configured prefix; these helpers only
//! build the part after it.

use stationcast_core::types::JobId;

/// Key holding the JSON job record.
pub fn job_record(job_id: &JobId) -> String {
    format!("job:{job_id}")
}
