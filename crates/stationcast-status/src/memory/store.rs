//! In-memory status backend using dashmap.
//!
//! Each record lives behind a dashmap shard lock, so both the version check
//! and the atomic count happen while the entry is held.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::status::StatusBackend;
use stationcast_core::types::{CountTransition, IncrementOutcome, ItemKey, JobId, JobRecord};

/// In-memory status backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatusBackend {
    /// Job records by id.
    records: Arc<DashMap<JobId, JobRecord>>,
}

impl MemoryStatusBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl StatusBackend for MemoryStatusBackend {
    fn backend_type(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: &JobRecord) -> AppResult<bool> {
        match self.records.entry(record.job_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn load(&self, job_id: &JobId) -> AppResult<Option<JobRecord>> {
        Ok(self.records.get(job_id).map(|r| r.value().clone()))
    }

    async fn compare_and_swap(&self, expected_version: u64, next: &JobRecord) -> AppResult<bool> {
        let Some(mut current) = self.records.get_mut(&next.job_id) else {
            return Err(AppError::not_found(format!("job {} not found", next.job_id)));
        };
        if current.version != expected_version {
            return Ok(false);
        }
        *current = next.clone();
        Ok(true)
    }

    async fn count_atomic(
        &self,
        job_id: &JobId,
        item_key: &ItemKey,
        now: DateTime<Utc>,
    ) -> AppResult<IncrementOutcome> {
        let Some(mut current) = self.records.get_mut(job_id) else {
            return Err(AppError::not_found(format!("job {job_id} not found")));
        };
        match current.apply_count(item_key, now) {
            CountTransition::Counted(next) => {
                *current = next.clone();
                Ok(IncrementOutcome::Counted(next))
            }
            CountTransition::AlreadyCounted => Ok(IncrementOutcome::AlreadyCounted(current.clone())),
            CountTransition::Overflow => Err(AppError::conflict(format!(
                "job {job_id} already counted all {} expected items",
                current.completed_count
            ))),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stationcast_core::types::TotalTransition;

    fn job(id: &str) -> JobRecord {
        JobRecord::new(JobId::parse(id).unwrap(), Utc::now())
    }

    #[tokio::test]
    async fn test_insert_is_set_if_absent() {
        let backend = MemoryStatusBackend::new();
        assert!(backend.insert(&job("a")).await.unwrap());
        assert!(!backend.insert(&job("a")).await.unwrap());
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_compare_and_swap_checks_version() {
        let backend = MemoryStatusBackend::new();
        let record = job("a");
        backend.insert(&record).await.unwrap();

        let TotalTransition::Set(next) = record.apply_total(2, Utc::now()) else {
            panic!("expected Set");
        };
        assert!(backend.compare_and_swap(record.version, &next).await.unwrap());
        // Same expected version again: stale.
        assert!(!backend.compare_and_swap(record.version, &next).await.unwrap());

        let stored = backend.load(&record.job_id).await.unwrap().unwrap();
        assert_eq!(stored.total_expected, Some(2));
    }

    #[tokio::test]
    async fn test_count_atomic_dedups() {
        let backend = MemoryStatusBackend::new();
        let record = job("a");
        backend.insert(&record).await.unwrap();
        let key = ItemKey::parse("k").unwrap();

        let first = backend.count_atomic(&record.job_id, &key, Utc::now()).await.unwrap();
        assert!(matches!(first, IncrementOutcome::Counted(_)));
        let second = backend.count_atomic(&record.job_id, &key, Utc::now()).await.unwrap();
        assert!(matches!(second, IncrementOutcome::AlreadyCounted(_)));
        assert_eq!(second.record().completed_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let backend = MemoryStatusBackend::new();
        let id = JobId::parse("missing").unwrap();
        assert!(backend.load(&id).await.unwrap().is_none());
        let err = backend
            .count_atomic(&id, &ItemKey::parse("k").unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, stationcast_core::error::ErrorKind::NotFound);
    }
}
