use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{error::AppError, utils::config::AppConfig};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{debug, warn};

use crate::job::SearchJob;

pub const BACKGROUND_PATH: &str = "/api/v1/search-resources-background";
pub const WORKER_SECRET_HEADER: &str = "x-worker-secret";

pub type DynDispatcher = Arc<dyn JobDispatcher>;

/// Hands an accepted job to whatever runs workers.
///
/// An `Ok` means the job was handed off, not that it ran.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job: SearchJob) -> Result<(), AppError>;

    fn name(&self) -> &'static str;
}

/// Receiving half of the in-process queue, drained by [`crate::run_worker_loop`].
pub type JobQueue = mpsc::Receiver<SearchJob>;

/// Sending half of the in-process queue.
#[derive(Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<SearchJob>,
}

/// Creates a bounded in-process job queue.
pub fn job_queue(capacity: usize) -> (ChannelDispatcher, JobQueue) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (ChannelDispatcher { sender }, receiver)
}

#[async_trait]
impl JobDispatcher for ChannelDispatcher {
    async fn dispatch(&self, job: SearchJob) -> Result<(), AppError> {
        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                warn!(job_id = %job.job_id, "job queue full; rejecting job");
                Err(AppError::Dispatch(format!(
                    "job queue is full; job {} was not enqueued",
                    job.job_id
                )))
            }
            Err(TrySendError::Closed(job)) => Err(AppError::Dispatch(format!(
                "job queue is closed; job {} was not enqueued",
                job.job_id
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Triggers the background endpoint of another instance over HTTP.
pub struct HttpDispatcher {
    client: reqwest::Client,
    endpoint: String,
    worker_secret: Option<String>,
    attempts: usize,
}

impl HttpDispatcher {
    pub fn new(
        callback_base_url: &str,
        worker_secret: Option<String>,
        attempts: usize,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{BACKGROUND_PATH}", callback_base_url.trim_end_matches('/')),
            worker_secret,
            attempts: attempts.max(1),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let base_url = config.callback_base_url.as_deref().ok_or_else(|| {
            AppError::Validation("callback_base_url is required for http dispatch".into())
        })?;
        // The background route is only guarded when a secret is configured.
        let secret = config.worker_secret.clone().ok_or_else(|| {
            AppError::Validation("worker_secret is required for http dispatch".into())
        })?;
        Self::new(base_url, Some(secret), config.dispatch_attempts)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, job: &SearchJob) -> Result<(), AppError> {
        let mut request = self.client.post(&self.endpoint).json(job);
        if let Some(secret) = &self.worker_secret {
            request = request.header(WORKER_SECRET_HEADER, secret);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(job_id = %job.job_id, %status, "background trigger accepted");
            Ok(())
        } else {
            warn!(job_id = %job.job_id, %status, "background trigger rejected");
            Err(AppError::Dispatch(format!(
                "background trigger answered {status}"
            )))
        }
    }
}

#[async_trait]
impl JobDispatcher for HttpDispatcher {
    async fn dispatch(&self, job: SearchJob) -> Result<(), AppError> {
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(self.attempts.saturating_sub(1));

        Retry::spawn(retry_strategy, || self.post(&job)).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
