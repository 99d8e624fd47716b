use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    utils::clock::{Clock, SystemClock},
};

use super::{
    store::JobStore,
    types::job_record::{JobRecord, JobStatus},
};

struct Entry {
    record: JobRecord,
    expires_at: DateTime<Utc>,
}

/// Process-local job store. Expiry is evaluated against the injected clock on
/// every access, and [`JobStore::purge_expired`] reclaims keys nobody reads again.
pub struct MemoryJobStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn expiry(&self, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self.clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, key: &str) -> Result<Option<JobRecord>, AppError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let live = entries.get(key).map(|entry| entry.expires_at > now);
        match live {
            Some(true) => Ok(entries.get(key).map(|entry| entry.record.clone())),
            Some(false) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, record: &JobRecord, ttl: Duration) -> Result<(), AppError> {
        let entry = Entry {
            record: record.clone(),
            expires_at: self.expiry(ttl),
        };
        self.entries.lock().await.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at > now) {
            return Ok(false);
        }
        entries.insert(
            key.to_owned(),
            Entry {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn set_if_status(
        &self,
        key: &str,
        expected: JobStatus,
        record: &JobRecord,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now && entry.record.status() == expected => {
                entry.record = record.clone();
                entry.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, AppError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before.saturating_sub(entries.len()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
