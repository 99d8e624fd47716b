use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    storage::{db::SurrealDbClient, memory::MemoryJobStore, surreal::SurrealJobStore},
    utils::{
        clock::{Clock, SystemClock},
        config::{AppConfig, JobStoreKind},
    },
};

use super::types::job_record::{JobRecord, JobStatus};

pub type DynJobStore = Arc<dyn JobStore>;

/// Key-value store with per-key expiry holding one [`JobRecord`] per job identifier.
///
/// A key expires `ttl` after its most recent write. Expired keys read as absent.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<JobRecord>, AppError>;

    /// Replaces whatever is stored under `key` and restarts its TTL.
    async fn set(&self, key: &str, record: &JobRecord, ttl: Duration) -> Result<(), AppError>;

    /// Writes only when no live record exists under `key`. Returns whether the write happened.
    async fn set_if_absent(
        &self,
        key: &str,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError>;

    /// Replaces the record only while a live record with status `expected` is
    /// stored under `key`, as one atomic step. Returns whether the write happened.
    async fn set_if_status(
        &self,
        key: &str,
        expected: JobStatus,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), AppError>;

    /// Drops expired keys eagerly. Backends with native expiry leave this as a no-op.
    async fn purge_expired(&self) -> Result<usize, AppError> {
        Ok(0)
    }

    fn backend_name(&self) -> &'static str;
}

/// Builds the job store selected by `cfg.job_store`.
pub async fn create_job_store(cfg: &AppConfig) -> Result<DynJobStore, AppError> {
    create_job_store_with_clock(cfg, Arc::new(SystemClock)).await
}

pub async fn create_job_store_with_clock(
    cfg: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<DynJobStore, AppError> {
    let store: DynJobStore = match cfg.job_store {
        JobStoreKind::Memory => Arc::new(MemoryJobStore::with_clock(clock)),
        JobStoreKind::Surrealdb => {
            let db = Arc::new(
                SurrealDbClient::new(
                    &cfg.surrealdb_address,
                    &cfg.surrealdb_username,
                    &cfg.surrealdb_password,
                    &cfg.surrealdb_namespace,
                    &cfg.surrealdb_database,
                )
                .await?,
            );
            let store = SurrealJobStore::with_clock(db, clock);
            store.ensure_initialized().await?;
            Arc::new(store)
        }
        JobStoreKind::Redis => create_redis_store(cfg).await?,
    };

    info!(backend = store.backend_name(), "Job store initialized");
    Ok(store)
}

/// Periodically drops expired records. Runs until the task is aborted.
pub async fn run_expiry_sweeper(store: DynJobStore, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(backend = store.backend_name(), ?period, "Expiry sweeper started");

    loop {
        ticker.tick().await;
        match store.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Purged expired job records"),
            Err(e) => warn!(error = %e, "Expiry sweep failed"),
        }
    }
}

#[cfg(feature = "redis")]
async fn create_redis_store(cfg: &AppConfig) -> Result<DynJobStore, AppError> {
    let url = cfg
        .redis_url
        .as_deref()
        .ok_or_else(|| AppError::Validation("redis_url is required for the redis job store".into()))?;
    Ok(Arc::new(
        crate::storage::redis_store::RedisJobStore::connect(url).await?,
    ))
}

#[cfg(not(feature = "redis"))]
#[allow(clippy::unused_async)]
async fn create_redis_store(_cfg: &AppConfig) -> Result<DynJobStore, AppError> {
    Err(AppError::Validation(
        "the redis job store requires building with the `redis` feature".into(),
    ))
}
