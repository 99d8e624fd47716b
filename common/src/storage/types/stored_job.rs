use crate::{error::AppError, stored_object};

use super::job_record::JobRecord;

stored_object!(StoredJob, "search_job", {
    payload: String,
    status: String,
    #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime")]
    expires_at: DateTime<Utc>
});

impl StoredJob {
    pub fn new(
        job_id: &str,
        record: &JobRecord,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            id: job_id.to_owned(),
            created_at: now,
            updated_at: now,
            payload: serde_json::to_string(record)?,
            status: record.status().as_str().to_owned(),
            expires_at,
        })
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn record(&self) -> Result<JobRecord, AppError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}
