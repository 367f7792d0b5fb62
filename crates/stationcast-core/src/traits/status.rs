//! Status backend trait: the durable home of job records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;
use crate::types::{IncrementOutcome, ItemKey, JobId, JobRecord};

/// Storage primitives for job records (Redis, in-memory).
///
/// Backends only offer guarded writes. The read-modify-write logic built on
/// top of them lives in `stationcast-status::StatusStore`, which is the only
/// type callers should use.
#[async_trait]
pub trait StatusBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type name (e.g., "memory", "redis").
    fn backend_type(&self) -> &str;

    /// Insert a record if no record exists for its job id.
    /// Returns `false` if a record already existed.
    async fn insert(&self, record: &JobRecord) -> AppResult<bool>;

    /// Load the current record, or `None` if the job is unknown.
    async fn load(&self, job_id: &JobId) -> AppResult<Option<JobRecord>>;

    /// Replace the stored record with `next` only if the stored version
    /// equals `expected_version`. Returns `false` when the version moved.
    async fn compare_and_swap(&self, expected_version: u64, next: &JobRecord) -> AppResult<bool>;

    /// Count `item_key` for the job in a single atomic step, without a
    /// version check. Used after the conditional-update budget is spent.
    async fn count_atomic(
        &self,
        job_id: &JobId,
        item_key: &ItemKey,
        now: DateTime<Utc>,
    ) -> AppResult<IncrementOutcome>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
