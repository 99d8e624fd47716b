use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::storage::types::job_record::JobRecord;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use search_pipeline::{JobDispatcher, SearchJob, Submission};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

fn parse_job(payload: Result<Json<Map<String, Value>>, JsonRejection>) -> Result<SearchJob, ApiError> {
    let Json(payload) =
        payload.map_err(|rejection| ApiError::ValidationError(rejection.body_text()))?;
    Ok(SearchJob::from_payload(payload)?)
}

pub async fn search_start(
    State(state): State<ApiState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let job = parse_job(payload)?;
    let job_id = job.job_id.clone();

    let outcome = state.submitter.submit(job).await?;
    let code = match outcome {
        Submission::Accepted => StatusCode::ACCEPTED,
        Submission::Existing(_) => StatusCode::OK,
    };

    Ok((code, Json(json!({ "jobId": job_id, "status": outcome.status() }))))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "jobId")]
    job_id: Option<String>,
}

pub async fn search_status(
    State(state): State<ApiState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<JobRecord>, ApiError> {
    let record = state.poller.poll(query.job_id.as_deref()).await?;
    Ok(Json(record))
}

/// Worker trigger. Queues the job on this instance and answers before it runs.
pub async fn search_background(
    State(state): State<ApiState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let job = parse_job(payload)?;
    let job_id = job.job_id.clone();

    state.local_queue.dispatch(job).await?;
    info!(%job_id, "Background search queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "jobId": job_id, "status": "accepted" })),
    ))
}
