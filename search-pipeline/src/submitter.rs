use std::sync::Arc;

use common::{
    error::AppError,
    storage::{
        store::DynJobStore,
        types::job_record::{JobRecord, JobStatus},
    },
    utils::clock::{Clock, SystemClock},
};
use tracing::{error, info};

use crate::{config::JobSettings, dispatch::DynDispatcher, job::SearchJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A fresh `pending` record was written and the job was handed off.
    Accepted,
    /// A live record already exists for this identifier; nothing was written or dispatched.
    Existing(JobStatus),
}

impl Submission {
    pub fn status(&self) -> JobStatus {
        match self {
            Submission::Accepted => JobStatus::Pending,
            Submission::Existing(status) => *status,
        }
    }
}

/// Accepts jobs: writes the `pending` record, then hands the job to a dispatcher.
#[derive(Clone)]
pub struct JobSubmitter {
    store: DynJobStore,
    dispatcher: DynDispatcher,
    settings: JobSettings,
    clock: Arc<dyn Clock>,
}

impl JobSubmitter {
    pub fn new(store: DynJobStore, dispatcher: DynDispatcher, settings: JobSettings) -> Self {
        Self::with_clock(store, dispatcher, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: DynJobStore,
        dispatcher: DynDispatcher,
        settings: JobSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            settings,
            clock,
        }
    }

    /// Returns as soon as the record is written. The hand-off runs on its own
    /// task, so a slow dispatcher never holds the caller; its failures are
    /// logged, never returned.
    pub async fn submit(&self, job: SearchJob) -> Result<Submission, AppError> {
        let record = JobRecord::pending(job.params.clone(), self.clock.now_millis());

        let created = self
            .store
            .set_if_absent(&job.job_id, &record, self.settings.ttl)
            .await?;

        if !created {
            let status = self
                .store
                .get(&job.job_id)
                .await?
                .map_or(JobStatus::Pending, |existing| existing.status());
            info!(job_id = %job.job_id, %status, "duplicate submission; job already exists");
            return Ok(Submission::Existing(status));
        }

        info!(job_id = %job.job_id, "search job accepted");
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            let job_id = job.job_id.clone();
            match dispatcher.dispatch(job).await {
                Ok(()) => info!(%job_id, dispatcher = dispatcher.name(), "search job dispatched"),
                Err(err) => error!(
                    %job_id,
                    dispatcher = dispatcher.name(),
                    error = %err,
                    "failed to dispatch search job"
                ),
            }
        });

        Ok(Submission::Accepted)
    }
}
