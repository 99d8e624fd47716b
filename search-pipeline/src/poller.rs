use common::{
    error::AppError,
    storage::{store::DynJobStore, types::job_record::JobRecord},
};

/// Read-only view of job state.
#[derive(Clone)]
pub struct JobPoller {
    store: DynJobStore,
}

impl JobPoller {
    pub fn new(store: DynJobStore) -> Self {
        Self { store }
    }

    /// Returns the record exactly as last written. A job that ran and failed is
    /// an `Ok` error record; `NotFound` means never submitted or expired.
    /// The identifier is not trimmed: it is the same key the submitter wrote.
    pub async fn poll(&self, job_id: Option<&str>) -> Result<JobRecord, AppError> {
        let job_id = job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::Validation("jobId is required".into()))?;

        self.store
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No job found for id {job_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::{memory::MemoryJobStore, store::JobStore};
    use std::{sync::Arc, time::Duration};

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let poller = JobPoller::new(Arc::new(MemoryJobStore::new()));
        let err = poller.poll(Some("nonexistent")).await.expect_err("missing");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_identifier_is_a_validation_error() {
        let poller = JobPoller::new(Arc::new(MemoryJobStore::new()));
        for id in [None, Some(""), Some("  ")] {
            let err = poller.poll(id).await.expect_err("invalid");
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn padded_identifier_is_looked_up_verbatim() {
        let store = Arc::new(MemoryJobStore::new());
        let record = JobRecord::searching(3);
        store
            .set("abc123 ", &record, Duration::from_secs(600))
            .await
            .expect("set");

        let poller = JobPoller::new(store);
        assert_eq!(poller.poll(Some("abc123 ")).await.expect("poll"), record);
        assert!(matches!(
            poller.poll(Some("abc123")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_jobs_are_reported_not_raised() {
        let store = Arc::new(MemoryJobStore::new());
        let record = JobRecord::error("upstream unavailable", 7);
        store
            .set("job", &record, Duration::from_secs(600))
            .await
            .expect("set");

        let poller = JobPoller::new(store);
        assert_eq!(poller.poll(Some("job")).await.expect("poll"), record);
        assert_eq!(poller.poll(Some("job")).await.expect("poll again"), record);
    }
}
