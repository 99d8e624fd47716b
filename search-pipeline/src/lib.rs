#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod config;
pub mod dispatch;
pub mod job;
pub mod poller;
pub mod submitter;
pub mod utils;
pub mod worker;

pub use config::JobSettings;
pub use dispatch::{job_queue, ChannelDispatcher, HttpDispatcher, JobDispatcher, JobQueue};
pub use job::SearchJob;
pub use poller::JobPoller;
pub use submitter::{JobSubmitter, Submission};
pub use worker::{OpenAiResourceSearcher, ResourceSearcher, RunOutcome, SearchWorker};

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

/// Drains the in-process queue, running up to `concurrency` jobs at a time.
/// Returns once every sender is dropped, the queue is empty and every job it
/// started has written its terminal record.
pub async fn run_worker_loop(mut queue: JobQueue, worker: Arc<SearchWorker>, concurrency: usize) {
    let worker_id = format!("search-worker-{}", Uuid::new_v4());
    let concurrency = u32::try_from(concurrency.max(1)).unwrap_or(u32::MAX);
    let permits = Arc::new(Semaphore::new(concurrency as usize));
    info!(%worker_id, concurrency, "search worker loop started");

    while let Some(job) = queue.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        info!(%worker_id, job_id = %job.job_id, "picked up search job");

        let handle = worker.spawn_run(job);
        tokio::spawn(async move {
            handle.await.ok();
            drop(permit);
        });
    }

    info!(%worker_id, "job queue closed; waiting for running jobs");
    // Every permit comes back only after the last running job has finished.
    if permits.acquire_many(concurrency).await.is_err() {
        warn!(%worker_id, "worker permits closed before running jobs finished");
    }
    info!(%worker_id, "worker loop exiting");
}
