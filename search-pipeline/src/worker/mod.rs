mod normalize;
mod services;

pub use normalize::normalize_results;
pub use services::{OpenAiResourceSearcher, ResourceSearcher};

use std::{sync::Arc, time::Duration};

use common::{
    error::AppError,
    storage::{
        store::DynJobStore,
        types::{
            job_record::{JobRecord, JobStatus},
            resource_results::ResourceResults,
            search_params::SearchParams,
        },
    },
    utils::clock::{Clock, SystemClock},
};
use tokio::task::JoinHandle;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{error, info, warn};

use crate::{config::JobSettings, job::SearchJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The job was claimed and ended with this terminal status.
    Finished(JobStatus),
    /// The job was not `pending`, so nothing was written. Holds the status
    /// found, if any record was live.
    Skipped(Option<JobStatus>),
}

/// Runs one job from `searching` to a terminal record.
pub struct SearchWorker {
    store: DynJobStore,
    searcher: Arc<dyn ResourceSearcher>,
    settings: JobSettings,
    clock: Arc<dyn Clock>,
}

impl SearchWorker {
    pub fn new(
        store: DynJobStore,
        searcher: Arc<dyn ResourceSearcher>,
        settings: JobSettings,
    ) -> Self {
        Self::with_clock(store, searcher, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: DynJobStore,
        searcher: Arc<dyn ResourceSearcher>,
        settings: JobSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            searcher,
            settings,
            clock,
        }
    }

    /// Claims a `pending` job by moving it to `searching`, performs the search
    /// and writes exactly one terminal record. Jobs that are absent, already
    /// running or finished are skipped. Search failures end up in the record;
    /// only store failures are returned.
    #[tracing::instrument(skip_all, fields(job_id = %job.job_id))]
    pub async fn run(&self, job: SearchJob) -> Result<RunOutcome, AppError> {
        let searching = JobRecord::searching(self.clock.now_millis());
        let claimed = self
            .store
            .set_if_status(&job.job_id, JobStatus::Pending, &searching, self.settings.ttl)
            .await?;
        if !claimed {
            let current = self.store.get(&job.job_id).await?.map(|record| record.status());
            warn!(status = ?current, "job is not pending; skipping");
            return Ok(RunOutcome::Skipped(current));
        }
        info!(location = %job.params.location, "search started");

        let record = match self.execute(&job.params).await {
            Ok(results) => JobRecord::complete(results, self.clock.now_millis()),
            Err(err) => {
                warn!(error = %err, "search failed");
                JobRecord::error(failure_message(&err), self.clock.now_millis())
            }
        };

        self.write_terminal(&job.job_id, &record).await?;
        Ok(RunOutcome::Finished(record.status()))
    }

    /// Runs the job on its own task, logging the outcome.
    pub fn spawn_run(self: &Arc<Self>, job: SearchJob) -> JoinHandle<()> {
        let worker = Arc::clone(self);
        tokio::spawn(async move {
            let job_id = job.job_id.clone();
            match worker.run(job).await {
                Ok(RunOutcome::Finished(status)) => info!(%job_id, %status, "search job finished"),
                Ok(RunOutcome::Skipped(_)) => {}
                Err(err) => error!(%job_id, error = %err, "search job could not be recorded"),
            }
        })
    }

    async fn execute(&self, params: &SearchParams) -> Result<ResourceResults, AppError> {
        let searcher = Arc::clone(&self.searcher);
        let params = params.clone();
        let timeout = self.settings.search_timeout;

        // A separate task turns a panicking searcher into a JoinError instead of
        // unwinding past the terminal write.
        let handle =
            tokio::spawn(async move { tokio::time::timeout(timeout, searcher.search(&params)).await });

        let raw = handle
            .await?
            .map_err(|_| AppError::Timeout(timeout.as_secs()))??;

        Ok(normalize_results(&raw))
    }

    async fn write_terminal(&self, job_id: &str, record: &JobRecord) -> Result<(), AppError> {
        let retry_strategy = ExponentialBackoff::from_millis(50)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(self.settings.terminal_write_attempts.saturating_sub(1));

        Retry::spawn(retry_strategy, || {
            self.store.set(job_id, record, self.settings.ttl)
        })
        .await
    }
}

fn failure_message(err: &AppError) -> String {
    match err {
        AppError::Timeout(secs) => {
            format!("The resource search timed out after {secs} seconds. Please try again.")
        }
        AppError::Join(_) => "The resource search stopped unexpectedly. Please try again.".into(),
        other => format!("The resource search failed: {other}"),
    }
}
