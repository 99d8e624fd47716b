//! Redis-backed job store (optional, `redis` feature).
//!
//! Redis expires keys natively, so TTL handling is a plain `SET .. EX` and
//! `purge_expired` keeps the default no-op.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::error::AppError;

use super::{
    store::JobStore,
    types::job_record::{JobRecord, JobStatus},
};

const DEFAULT_KEY_PREFIX: &str = "search_job:";

// Compare the stored status and overwrite in one server-side step.
const SET_IF_STATUS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then return 0 end
local ok, decoded = pcall(cjson.decode, current)
if not ok or decoded['status'] ~= ARGV[1] then return 0 end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

#[derive(Clone)]
pub struct RedisJobStore {
    connection: MultiplexedConnection,
    key_prefix: String,
}

impl RedisJobStore {
    /// Connects to `redis_url` (e.g. `redis://localhost:6379`).
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        })
    }

    #[must_use]
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    fn key(&self, job_id: &str) -> String {
        format!("{}{job_id}", self.key_prefix)
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn get(&self, key: &str) -> Result<Option<JobRecord>, AppError> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        payload
            .map(|payload| serde_json::from_str(&payload).map_err(AppError::from))
            .transpose()
    }

    async fn set(&self, key: &str, record: &JobRecord, ttl: Duration) -> Result<(), AppError> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(self.key(key))
            .arg(payload)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.connection.clone();
        // SET NX replies nil when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(key))
            .arg(payload)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn set_if_status(
        &self,
        key: &str,
        expected: JobStatus,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.connection.clone();
        let replaced: i64 = redis::Script::new(SET_IF_STATUS_SCRIPT)
            .key(self.key(key))
            .arg(expected.as_str())
            .arg(payload)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(replaced == 1)
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
