use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authorization error: {0}")]
    Auth(String),
    #[error("Dispatch error: {0}")]
    Dispatch(String),
    #[error("Search timed out after {0} seconds")]
    Timeout(u64),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Search processing error: {0}")]
    Processing(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Errors raised by the job store itself, as opposed to the search or the caller.
    pub fn is_store_error(&self) -> bool {
        #[cfg(feature = "redis")]
        if matches!(self, AppError::Redis(_)) {
            return true;
        }
        matches!(self, AppError::Database(_) | AppError::Serialization(_))
    }
}
