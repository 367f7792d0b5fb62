//! Redis status backend implementation.
//!
//! Each job is one JSON string key. The conditional update and the atomic
//! count are Lua scripts, so the check and the write run as one Redis
//! command.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::{AsyncCommands, Script};
use tracing::debug;

use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;
use stationcast_core::traits::status::StatusBackend;
use stationcast_core::types::{IncrementOutcome, ItemKey, JobId, JobRecord};

use super::client::RedisClient;
use crate::keys;

/// KEYS[1] = record key, ARGV[1] = expected version, ARGV[2] = next record.
/// Returns 1 on write, 0 on version mismatch, -1 when the key is missing.
const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then return -1 end
local record = cjson.decode(current)
if tonumber(record['version']) ~= tonumber(ARGV[1]) then return 0 end
redis.call('SET', KEYS[1], ARGV[2])
return 1
"#;

/// KEYS[1] = record key, ARGV[1] = item key, ARGV[2] = RFC 3339 timestamp.
/// Returns {code, record}: 1 counted, 0 already counted, -1 missing,
/// -2 counter already at total.
const COUNT_ITEM: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then return {-1, ''} end
local record = cjson.decode(current)
local items = record['counted_items']
if type(items) ~= 'table' then items = {} end
for _, key in ipairs(items) do
  if key == ARGV[1] then return {0, current} end
end
local total = record['total_expected']
local has_total = total ~= nil and total ~= cjson.null
local completed = tonumber(record['completed_count'])
if has_total and completed >= tonumber(total) then return {-2, current} end
table.insert(items, ARGV[1])
table.sort(items)
record['counted_items'] = items
completed = completed + 1
record['completed_count'] = completed
if not has_total then
  record['status'] = 'queued'
elseif completed >= tonumber(total) then
  record['status'] = 'completed'
else
  record['status'] = 'processing'
end
record['last_updated'] = ARGV[2]
record['version'] = tonumber(record['version']) + 1
local encoded = cjson.encode(record)
redis.call('SET', KEYS[1], encoded)
return {1, encoded}
"#;

/// Redis-backed status backend.
#[derive(Debug, Clone)]
pub struct RedisStatusBackend {
    /// Redis client.
    client: RedisClient,
    /// Conditional update script.
    cas_script: Script,
    /// Atomic add-if-absent count script.
    count_script: Script,
}

impl RedisStatusBackend {
    /// Create a new Redis status backend.
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            cas_script: Script::new(COMPARE_AND_SWAP),
            count_script: Script::new(COUNT_ITEM),
        }
    }

    fn decode(raw: &str) -> AppResult<JobRecord> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::status(format!("Corrupt job record in Redis: {e}")))
    }
}

#[async_trait]
impl StatusBackend for RedisStatusBackend {
    fn backend_type(&self) -> &str {
        "redis"
    }

    async fn insert(&self, record: &JobRecord) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(&keys::job_record(&record.job_id));
        let json = serde_json::to_string(record)?;
        let mut conn = self.client.conn_mut();

        // SET key value NX
        let result: Option<String> = self
            .client
            .bounded(
                redis::cmd("SET")
                    .arg(&full_key)
                    .arg(&json)
                    .arg("NX")
                    .query_async(&mut conn),
            )
            .await?;

        Ok(result.is_some())
    }

    async fn load(&self, job_id: &JobId) -> AppResult<Option<JobRecord>> {
        let full_key = self.client.prefixed_key(&keys::job_record(job_id));
        let mut conn = self.client.conn_mut();
        let raw: Option<String> = self.client.bounded(conn.get(&full_key)).await?;
        raw.as_deref().map(Self::decode).transpose()
    }

    async fn compare_and_swap(&self, expected_version: u64, next: &JobRecord) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(&keys::job_record(&next.job_id));
        let json = serde_json::to_string(next)?;
        let mut conn = self.client.conn_mut();

        let mut invocation = self.cas_script.key(&full_key);
        invocation.arg(expected_version).arg(&json);
        let code: i64 = self
            .client
            .bounded(invocation.invoke_async(&mut conn))
            .await?;

        match code {
            1 => Ok(true),
            0 => {
                debug!(job_id = %next.job_id, expected_version, "Conditional update lost the race");
                Ok(false)
            }
            _ => Err(AppError::not_found(format!("job {} not found", next.job_id))),
        }
    }

    async fn count_atomic(
        &self,
        job_id: &JobId,
        item_key: &ItemKey,
        now: DateTime<Utc>,
    ) -> AppResult<IncrementOutcome> {
        let full_key = self.client.prefixed_key(&keys::job_record(job_id));
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut conn = self.client.conn_mut();

        let mut invocation = self.count_script.key(&full_key);
        invocation.arg(item_key.as_str()).arg(&timestamp);
        let (code, raw): (i64, String) = self
            .client
            .bounded(invocation.invoke_async(&mut conn))
            .await?;

        match code {
            1 => Ok(IncrementOutcome::Counted(Self::decode(&raw)?)),
            0 => Ok(IncrementOutcome::AlreadyCounted(Self::decode(&raw)?)),
            -2 => Err(AppError::conflict(format!(
                "job {job_id} already counted all expected items"
            ))),
            _ => Err(AppError::not_found(format!("job {job_id} not found"))),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = self
            .client
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(pong == "PONG")
    }
}
