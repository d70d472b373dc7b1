//! Queue message payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use capgen_models::JobId;

/// Message asking a worker to run the content pipeline for one job.
///
/// The payload carries only identifiers; the worker loads current job
/// state (file paths, generation parameters) from the database at pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentJob {
    /// External job identifier
    pub job_id: JobId,
    /// Owning user
    pub user_id: Uuid,
    /// When the message was enqueued
    pub created_at: DateTime<Utc>,
}

impl GenerateContentJob {
    pub fn new(job_id: JobId, user_id: Uuid) -> Self {
        Self {
            job_id,
            user_id,
            created_at: Utc::now(),
        }
    }

    /// Dedup key: one in-flight generation per job.
    pub fn idempotency_key(&self) -> String {
        format!("generate:{}", self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_roundtrip() {
        let job = GenerateContentJob::new(JobId::new(), Uuid::new_v4());
        let json = serde_json::to_string(&job).expect("serialize job");
        let decoded: GenerateContentJob = serde_json::from_str(&json).expect("deserialize job");

        assert_eq!(decoded.job_id, job.job_id);
        assert_eq!(decoded.user_id, job.user_id);
        assert_eq!(decoded.created_at, job.created_at);
    }

    #[test]
    fn test_idempotency_key_is_job_scoped() {
        let job_id = JobId::new();
        let a = GenerateContentJob::new(job_id, Uuid::new_v4());
        let b = GenerateContentJob::new(job_id, Uuid::new_v4());
        assert_eq!(a.idempotency_key(), b.idempotency_key());
    }
}
