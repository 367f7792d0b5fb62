//! Status store that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use stationcast_core::config::status::StatusConfig;
use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::status::StatusBackend;
use stationcast_core::types::{
    CountTransition, IncrementOutcome, ItemKey, JobId, JobRecord, JobView, TotalOutcome,
    TotalTransition,
};

/// The job status store.
///
/// Every mutation is a read of the versioned record, a pure transition on
/// [`JobRecord`], and a conditional write that only lands if nobody else
/// wrote in between. Lost races are retried up to `retry_budget` times.
#[derive(Debug, Clone)]
pub struct StatusStore {
    /// The inner backend.
    inner: Arc<dyn StatusBackend>,
    /// Conditional-update attempts per operation.
    retry_budget: u32,
    /// Threshold for reporting a processing job as stalled.
    stall_after: Option<Duration>,
}

impl StatusStore {
    /// Create a new status store from configuration.
    pub async fn new(config: &StatusConfig) -> AppResult<Self> {
        let inner: Arc<dyn StatusBackend> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis status backend");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisStatusBackend::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory status backend");
                Arc::new(crate::memory::MemoryStatusBackend::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown status provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self::from_backend(inner, config))
    }

    /// Create a status store from an existing backend (for testing).
    pub fn from_backend(backend: Arc<dyn StatusBackend>, config: &StatusConfig) -> Self {
        Self {
            inner: backend,
            retry_budget: config.retry_budget.max(1),
            stall_after: (config.stall_after_seconds > 0)
                .then(|| Duration::from_secs(config.stall_after_seconds)),
        }
    }

    /// Get a reference to the inner backend.
    pub fn backend(&self) -> &dyn StatusBackend {
        self.inner.as_ref()
    }

    /// Create the initial `queued` record for a job.
    ///
    /// Fails with `Conflict` if the job id is already taken.
    pub async fn create(&self, job_id: &JobId) -> AppResult<JobRecord> {
        let record = JobRecord::new(job_id.clone(), Utc::now());
        if !self.inner.insert(&record).await? {
            return Err(AppError::conflict(format!("job {job_id} already exists")));
        }
        debug!(job_id = %job_id, "Created job record");
        Ok(record)
    }

    /// Record the expected item count, once.
    ///
    /// Repeating the call with the same total is a no-op; a different total
    /// fails with `Conflict` and leaves the record untouched.
    pub async fn set_total_if_unset(&self, job_id: &JobId, total: u32) -> AppResult<TotalOutcome> {
        for attempt in 1..=self.retry_budget {
            let current = self.load_existing(job_id).await?;
            match current.apply_total(total, Utc::now()) {
                TotalTransition::Unchanged => return Ok(TotalOutcome::AlreadySet(current)),
                TotalTransition::Mismatch { existing } => {
                    return Err(AppError::conflict(format!(
                        "job {job_id} already expects {existing} items, refusing {total}"
                    )));
                }
                TotalTransition::Set(next) => {
                    if self.inner.compare_and_swap(current.version, &next).await? {
                        return Ok(TotalOutcome::Set(next));
                    }
                    debug!(job_id = %job_id, attempt, "Total update conflicted, retrying");
                }
            }
        }

        Err(AppError::concurrency_conflict(format!(
            "could not record total for job {job_id} within {} attempts",
            self.retry_budget
        )))
    }

    /// Count `item_key` as completed for the job.
    ///
    /// Counting the same item key again returns
    /// [`IncrementOutcome::AlreadyCounted`] without touching the record.
    /// When every conditional attempt loses its race the increment is
    /// handed to the backend's atomic count instead of being dropped.
    pub async fn increment_completed(
        &self,
        job_id: &JobId,
        item_key: &ItemKey,
    ) -> AppResult<IncrementOutcome> {
        for attempt in 1..=self.retry_budget {
            let current = self.load_existing(job_id).await?;
            match current.apply_count(item_key, Utc::now()) {
                CountTransition::AlreadyCounted => {
                    debug!(job_id = %job_id, item_key = %item_key, "Item already counted");
                    return Ok(IncrementOutcome::AlreadyCounted(current));
                }
                CountTransition::Overflow => {
                    return Err(AppError::conflict(format!(
                        "job {job_id} already counted all {} expected items",
                        current.completed_count
                    )));
                }
                CountTransition::Counted(next) => {
                    if self.inner.compare_and_swap(current.version, &next).await? {
                        return Ok(IncrementOutcome::Counted(next));
                    }
                    debug!(
                        job_id = %job_id,
                        item_key = %item_key,
                        attempt,
                        "Completion update conflicted, retrying"
                    );
                }
            }
        }

        warn!(
            job_id = %job_id,
            item_key = %item_key,
            retry_budget = self.retry_budget,
            "Conditional update budget exhausted, using atomic count"
        );
        self.inner.count_atomic(job_id, item_key, Utc::now()).await
    }

    /// Read the caller-facing view of a job.
    pub async fn get(&self, job_id: &JobId) -> AppResult<JobView> {
        let record = self.load_existing(job_id).await?;
        Ok(record.view(Utc::now(), self.stall_after))
    }

    /// Check that the backend is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn load_existing(&self, job_id: &JobId) -> AppResult<JobRecord> {
        self.inner
            .load(job_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("job {job_id} not found")))
    }
}
