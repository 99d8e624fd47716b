use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::AppError,
    utils::clock::{Clock, SystemClock},
};

use super::{
    db::SurrealDbClient,
    store::JobStore,
    types::{
        job_record::{JobRecord, JobStatus},
        stored_job::StoredJob,
        StoredObject,
    },
};

/// Job store backed by a `search_job` table. SurrealDB has no native key expiry,
/// so every row carries `expires_at`; reads treat stale rows as absent and the
/// periodic sweep deletes them.
pub struct SurrealJobStore {
    db: Arc<SurrealDbClient>,
    clock: Arc<dyn Clock>,
}

impl SurrealJobStore {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Arc<SurrealDbClient>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn ensure_initialized(&self) -> Result<(), AppError> {
        self.db
            .query(
                "DEFINE TABLE IF NOT EXISTS search_job SCHEMALESS;
                DEFINE INDEX IF NOT EXISTS idx_search_job_expires ON search_job FIELDS expires_at;",
            )
            .await?
            .check()?;
        Ok(())
    }

    fn expiry(&self, now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        now.checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn is_record_exists(err: &surrealdb::Error) -> bool {
    matches!(
        err,
        surrealdb::Error::Db(surrealdb::error::Db::RecordExists { .. })
    ) || err.to_string().contains("already exists")
}

#[async_trait]
impl JobStore for SurrealJobStore {
    async fn get(&self, key: &str) -> Result<Option<JobRecord>, AppError> {
        let Some(row) = self.db.get_item::<StoredJob>(key).await? else {
            return Ok(None);
        };

        if row.is_live(self.clock.now()) {
            return Ok(Some(row.record()?));
        }

        debug!(job_id = %key, "dropping expired job row on read");
        self.db.delete_item::<StoredJob>(key).await?;
        Ok(None)
    }

    async fn set(&self, key: &str, record: &JobRecord, ttl: Duration) -> Result<(), AppError> {
        let now = self.clock.now();
        let row = StoredJob::new(key, record, now, self.expiry(now, ttl))?;
        self.db.upsert_item(row).await?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let now = self.clock.now();

        // A stale row must not block a fresh submission under the same key.
        self.db
            .query("DELETE type::thing($table, $id) WHERE expires_at <= $now")
            .bind(("table", StoredJob::table_name()))
            .bind(("id", key.to_owned()))
            .bind(("now", surrealdb::sql::Datetime::from(now)))
            .await?
            .check()?;

        let row = StoredJob::new(key, record, now, self.expiry(now, ttl))?;
        match self.db.create_item(row).await {
            Ok(_) => Ok(true),
            Err(err) if is_record_exists(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_if_status(
        &self,
        key: &str,
        expected: JobStatus,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let now = self.clock.now();
        let row = StoredJob::new(key, record, now, self.expiry(now, ttl))?;

        // UPDATE never creates, so an absent or expired row is left alone.
        let updated: Vec<StoredJob> = self
            .db
            .query(
                "UPDATE type::thing($table, $id)
                SET payload = $payload, status = $status, expires_at = $expires_at, updated_at = $now
                WHERE status = $expected AND expires_at > $now
                RETURN AFTER",
            )
            .bind(("table", StoredJob::table_name()))
            .bind(("id", key.to_owned()))
            .bind(("payload", row.payload))
            .bind(("status", row.status))
            .bind(("expires_at", surrealdb::sql::Datetime::from(row.expires_at)))
            .bind(("now", surrealdb::sql::Datetime::from(now)))
            .bind(("expected", expected.as_str()))
            .await?
            .take(0)?;
        Ok(!updated.is_empty())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db.query("RETURN true").await?.check()?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, AppError> {
        let deleted: Vec<StoredJob> = self
            .db
            .query("DELETE type::table($table) WHERE expires_at <= $now RETURN BEFORE")
            .bind(("table", StoredJob::table_name()))
            .bind(("now", surrealdb::sql::Datetime::from(self.clock.now())))
            .await?
            .take(0)?;
        Ok(deleted.len())
    }

    fn backend_name(&self) -> &'static str {
        "surrealdb"
    }
}
