//! The persisted job record and the pure transitions applied to it.
//!
//! Status stores never mutate a record in place: they read a versioned
//! record, ask it for the next record, and write that back conditionally.
//! Keeping the transitions here means every backend enforces the same
//! invariants:
//!
//! - before `total_expected` is set the status is `queued`;
//! - once set, `0 <= completed_count <= total_expected`;
//! - `completed` iff `completed_count == total_expected`;
//! - an item key is counted at most once.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ItemKey, JobId};

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not yet expanded.
    Queued,
    /// Expanded, items outstanding.
    Processing,
    /// Every expected item has been counted.
    Completed,
    /// Processing with no progress for longer than the configured threshold.
    /// Only ever produced by [`JobRecord::view`]; never stored.
    Stalled,
}

impl JobStatus {
    /// Derive the stored status from the counters.
    pub fn derive(total_expected: Option<u32>, completed_count: u32) -> Self {
        match total_expected {
            None => Self::Queued,
            Some(total) if completed_count >= total => Self::Completed,
            Some(_) => Self::Processing,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Stalled => "stalled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable job record owned by the status store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier.
    pub job_id: JobId,
    /// Stored status (never `Stalled`).
    pub status: JobStatus,
    /// Number of work items the job expanded into; unset until expansion.
    pub total_expected: Option<u32>,
    /// Number of distinct items counted as completed.
    pub completed_count: u32,
    /// Item keys already counted, used to ignore redelivered completions.
    #[serde(default)]
    pub counted_items: BTreeSet<ItemKey>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub last_updated: DateTime<Utc>,
    /// Incremented on every successful write; the conditional-update token.
    pub version: u64,
}

/// Result of asking a record to accept a total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TotalTransition {
    /// The total was unset; write this record.
    Set(JobRecord),
    /// The same total is already recorded; nothing to write.
    Unchanged,
    /// A different total is already recorded.
    Mismatch {
        /// The total currently stored.
        existing: u32,
    },
}

/// Result of asking a record to count an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountTransition {
    /// The item was not counted yet; write this record.
    Counted(JobRecord),
    /// The item key has been counted before.
    AlreadyCounted,
    /// Counting would push `completed_count` past `total_expected`.
    Overflow,
}

impl JobRecord {
    /// A freshly submitted job.
    pub fn new(job_id: JobId, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            total_expected: None,
            completed_count: 0,
            counted_items: BTreeSet::new(),
            created_at: now,
            last_updated: now,
            version: 1,
        }
    }

    /// Write-if-unset-or-equal for `total_expected`.
    pub fn apply_total(&self, total: u32, now: DateTime<Utc>) -> TotalTransition {
        match self.total_expected {
            Some(existing) if existing == total => TotalTransition::Unchanged,
            Some(existing) => TotalTransition::Mismatch { existing },
            None => {
                let mut next = self.clone();
                next.total_expected = Some(total);
                next.status = JobStatus::derive(Some(total), next.completed_count);
                if next.status == JobStatus::Queued {
                    next.status = JobStatus::Processing;
                }
                next.last_updated = now;
                next.version += 1;
                TotalTransition::Set(next)
            }
        }
    }

    /// Add `item_key` to the counted set and bump the counter by one.
    pub fn apply_count(&self, item_key: &ItemKey, now: DateTime<Utc>) -> CountTransition {
        if self.counted_items.contains(item_key) {
            return CountTransition::AlreadyCounted;
        }
        if let Some(total) = self.total_expected {
            if self.completed_count >= total {
                return CountTransition::Overflow;
            }
        }
        let mut next = self.clone();
        next.counted_items.insert(item_key.clone());
        next.completed_count += 1;
        next.status = JobStatus::derive(next.total_expected, next.completed_count);
        next.last_updated = now;
        next.version += 1;
        CountTransition::Counted(next)
    }

    /// The caller-facing projection of this record.
    ///
    /// A `processing` record whose last update is older than `stall_after`
    /// is reported as `stalled`.
    pub fn view(&self, now: DateTime<Utc>, stall_after: Option<Duration>) -> JobView {
        let mut status = self.status;
        if status == JobStatus::Processing {
            if let Some(threshold) = stall_after {
                let idle = now.signed_duration_since(self.last_updated);
                if idle.to_std().map(|idle| idle > threshold).unwrap_or(false) {
                    status = JobStatus::Stalled;
                }
            }
        }
        JobView {
            job_id: self.job_id.clone(),
            status,
            completed: self.completed_count,
            total: self.total_expected,
            last_updated: self.last_updated,
        }
    }
}

/// Read-only projection returned by status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    /// Job identifier.
    pub job_id: JobId,
    /// Reported status.
    pub status: JobStatus,
    /// Completed item count.
    pub completed: u32,
    /// Expected item count, `null` until expansion.
    pub total: Option<u32>,
    /// Timestamp of the last mutation.
    pub last_updated: DateTime<Utc>,
}

/// Outcome of `set_total_if_unset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TotalOutcome {
    /// This call recorded the total.
    Set(JobRecord),
    /// The same total had already been recorded.
    AlreadySet(JobRecord),
}

impl TotalOutcome {
    /// The record after the call.
    pub fn record(&self) -> &JobRecord {
        match self {
            Self::Set(record) | Self::AlreadySet(record) => record,
        }
    }
}

/// Outcome of `increment_completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The item was counted by this call.
    Counted(JobRecord),
    /// The item had already been counted; the record is unchanged.
    AlreadyCounted(JobRecord),
}

impl IncrementOutcome {
    /// The record after the call.
    pub fn record(&self) -> &JobRecord {
        match self {
            Self::Counted(record) | Self::AlreadyCounted(record) => record,
        }
    }

    /// Status after the call.
    pub fn status(&self) -> JobStatus {
        self.record().status
    }
}
