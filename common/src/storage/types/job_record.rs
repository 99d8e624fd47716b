use serde::{Deserialize, Serialize};

use super::{resource_results::ResourceResults, search_params::SearchParams};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Searching,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Searching => "searching",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// Position in the lifecycle. Both terminal states share the last stage.
    pub fn stage(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Searching => 1,
            JobStatus::Complete | JobStatus::Error => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single value stored under a job identifier. Every write replaces the
/// previous record wholesale. Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobRecord {
    #[serde(rename_all = "camelCase")]
    Pending { created_at: i64, params: SearchParams },
    #[serde(rename_all = "camelCase")]
    Searching { created_at: i64 },
    #[serde(rename_all = "camelCase")]
    Complete {
        completed_at: i64,
        results: ResourceResults,
    },
    #[serde(rename_all = "camelCase")]
    Error { completed_at: i64, error: String },
}

impl JobRecord {
    pub fn pending(params: SearchParams, created_at: i64) -> Self {
        JobRecord::Pending { created_at, params }
    }

    pub fn searching(created_at: i64) -> Self {
        JobRecord::Searching { created_at }
    }

    pub fn complete(results: ResourceResults, completed_at: i64) -> Self {
        JobRecord::Complete {
            completed_at,
            results,
        }
    }

    pub fn error(message: impl Into<String>, completed_at: i64) -> Self {
        let message = message.into();
        let error = if message.trim().is_empty() {
            "Resource search failed".to_string()
        } else {
            message
        };
        JobRecord::Error {
            completed_at,
            error,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobRecord::Pending { .. } => JobStatus::Pending,
            JobRecord::Searching { .. } => JobStatus::Searching,
            JobRecord::Complete { .. } => JobStatus::Complete,
            JobRecord::Error { .. } => JobStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}
