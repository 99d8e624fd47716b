use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use search_pipeline::dispatch::WORKER_SECRET_HEADER;

use crate::{api_state::ApiState, error::ApiError};

/// Guards the background trigger when a `worker_secret` is configured.
pub async fn worker_auth(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.worker_secret.as_deref() else {
        return Ok(next.run(request).await);
    };

    if extract_worker_secret(&request) != Some(expected) {
        tracing::warn!("Rejected background trigger with missing or wrong worker secret");
        return Err(ApiError::Unauthorized(
            "A valid worker secret is required".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

fn extract_worker_secret(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(WORKER_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|auth| auth.strip_prefix("Bearer ").map(str::trim))
        })
}
