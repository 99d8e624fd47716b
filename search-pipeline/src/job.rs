use common::{error::AppError, storage::types::search_params::SearchParams};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MAX_JOB_ID_LEN: usize = 256;

/// One unit of queued work: the caller's identifier plus the search params.
///
/// Serializes to the same flat shape clients submit, so it doubles as the
/// body of the background trigger request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchJob {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(flatten)]
    pub params: SearchParams,
}

impl SearchJob {
    pub fn new(job_id: impl Into<String>, params: SearchParams) -> Self {
        Self {
            job_id: job_id.into(),
            params,
        }
    }

    /// Validates a raw request body. Nothing is written anywhere before this succeeds.
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self, AppError> {
        let job_id = match payload.remove("jobId") {
            Some(Value::String(job_id)) if !job_id.trim().is_empty() => job_id,
            Some(Value::String(_)) | Some(Value::Null) | None => {
                return Err(AppError::Validation("jobId is required".into()))
            }
            Some(_) => return Err(AppError::Validation("jobId must be a string".into())),
        };

        if job_id.len() > MAX_JOB_ID_LEN {
            return Err(AppError::Validation(format!(
                "jobId must be at most {MAX_JOB_ID_LEN} characters"
            )));
        }

        let params = SearchParams::from_payload(payload)?;

        Ok(Self { job_id, params })
    }
}
