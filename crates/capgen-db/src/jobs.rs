//! Job repository: creation, listing, and the status state machine.
//!
//! Every transition is a single conditional UPDATE keyed on the current
//! status, so at-least-once queue delivery and concurrent API calls cannot
//! double-claim or rewind a job.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use capgen_models::{FileType, GenerationParams, Job, JobId, JobStatus, LengthPreset};

use crate::error::{DbError, DbResult};

const JOB_COLUMNS: &str = "id, job_id, user_id, client_id, file_type, original_filename, \
     file_path, converted_audio_path, status, progress, caption_length, \
     description_length, hashtag_count, result_data, error_message, created_at, \
     started_at, completed_at";

#[derive(Debug, FromRow)]
struct JobRow {
    id: i64,
    job_id: Uuid,
    user_id: Uuid,
    client_id: i64,
    file_type: String,
    original_filename: String,
    file_path: String,
    converted_audio_path: Option<String>,
    status: String,
    progress: i32,
    caption_length: String,
    description_length: String,
    hashtag_count: i32,
    result_data: Option<serde_json::Value>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = DbError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| DbError::decode(format!("Unknown job status '{}'", row.status)))?;
        let file_type = FileType::parse(&row.file_type)
            .ok_or_else(|| DbError::decode(format!("Unknown file type '{}'", row.file_type)))?;

        Ok(Job {
            id: row.id,
            job_id: JobId::from(row.job_id),
            user_id: row.user_id,
            client_id: row.client_id,
            file_type,
            original_filename: row.original_filename,
            file_path: row.file_path,
            converted_audio_path: row.converted_audio_path,
            status,
            progress: row.progress,
            params: GenerationParams {
                caption_length: LengthPreset::parse(&row.caption_length).unwrap_or_default(),
                description_length: LengthPreset::parse(&row.description_length)
                    .unwrap_or_default(),
                hashtag_count: row.hashtag_count.max(0) as u32,
            },
            result_data: row.result_data,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// Fields for a freshly uploaded job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_id: JobId,
    pub user_id: Uuid,
    pub client_id: i64,
    pub file_type: FileType,
    pub original_filename: String,
    pub file_path: String,
    pub params: GenerationParams,
    pub status: JobStatus,
}

/// Repository for jobs.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewJob) -> DbResult<Job> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "INSERT INTO jobs (job_id, user_id, client_id, file_type, original_filename, \
             file_path, status, caption_length, description_length, hashtag_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(new.job_id.as_uuid())
        .bind(new.user_id)
        .bind(new.client_id)
        .bind(new.file_type.as_str())
        .bind(&new.original_filename)
        .bind(&new.file_path)
        .bind(new.status.as_str())
        .bind(new.params.caption_length.as_str())
        .bind(new.params.description_length.as_str())
        .bind(new.params.hashtag_count as i32)
        .fetch_one(&self.pool)
        .await?;

        info!(
            job_id = %new.job_id,
            user_id = %new.user_id,
            file_type = %new.file_type,
            "Created job"
        );
        row.try_into()
    }

    pub async fn find_by_job_id(&self, job_id: JobId) -> DbResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = $1"
        ))
        .bind(job_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// A single job, only if owned by the user.
    pub async fn find_for_user(&self, job_id: JobId, user_id: Uuid) -> DbResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = $1 AND user_id = $2"
        ))
        .bind(job_id.as_uuid())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Paginated listing, newest first, optionally filtered by client.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        client_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Job>> {
        let limit = limit.clamp(1, 100);
        let offset = offset.max(0);

        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE user_id = $1 AND ($2::bigint IS NULL OR client_id = $2) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Move a job into `pending` with fresh generation parameters.
    ///
    /// Only `uploaded` and `failed` jobs may enter the queue; the WHERE
    /// clause is the state-machine guard. Returns false on a state
    /// conflict, in which case nothing changed.
    pub async fn try_mark_pending(&self, job_id: JobId, params: GenerationParams) -> DbResult<bool> {
        let params = params.clamped();
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', caption_length = $2, \
             description_length = $3, hashtag_count = $4, progress = 0, \
             error_message = NULL, completed_at = NULL \
             WHERE job_id = $1 AND status IN ('uploaded', 'failed')",
        )
        .bind(job_id.as_uuid())
        .bind(params.caption_length.as_str())
        .bind(params.description_length.as_str())
        .bind(params.hashtag_count as i32)
        .execute(&self.pool)
        .await?;

        let queued = result.rows_affected() > 0;
        if queued {
            info!(job_id = %job_id, "Job queued for generation");
        } else {
            debug!(job_id = %job_id, "Generation rejected: job not in a queueable state");
        }
        Ok(queued)
    }

    /// Claim a job for processing: `pending -> processing`.
    ///
    /// Compare-and-swap on the status makes redundant queue deliveries
    /// idempotent: only one claim wins. `allow_failed` is used by the
    /// queue-level retry path, which re-enters processing from the top
    /// after an infrastructure fault marked the job failed.
    pub async fn try_start_processing(&self, job_id: JobId, allow_failed: bool) -> DbResult<bool> {
        let statuses: &[&str] = if allow_failed {
            &["pending", "failed"]
        } else {
            &["pending"]
        };
        let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();

        let result = sqlx::query(
            "UPDATE jobs SET status = 'processing', started_at = now(), progress = 0 \
             WHERE job_id = $1 AND status = ANY($2)",
        )
        .bind(job_id.as_uuid())
        .bind(&statuses)
        .execute(&self.pool)
        .await?;

        let claimed = result.rows_affected() > 0;
        if claimed {
            info!(job_id = %job_id, "Job claimed for processing");
        } else {
            warn!(job_id = %job_id, "Job claim lost: not in a claimable state");
        }
        Ok(claimed)
    }

    /// Record a progress checkpoint.
    ///
    /// Progress is clamped to [0, 100] and never decreases; stale updates
    /// from a slower writer are absorbed by GREATEST.
    pub async fn update_progress(&self, job_id: JobId, progress: i32) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET progress = GREATEST(progress, LEAST(GREATEST($2, 0), 100)) \
             WHERE job_id = $1 AND status = 'processing'",
        )
        .bind(job_id.as_uuid())
        .bind(progress)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist the extracted audio path for a video job.
    pub async fn set_converted_audio_path(&self, job_id: JobId, path: &str) -> DbResult<()> {
        sqlx::query("UPDATE jobs SET converted_audio_path = $2 WHERE job_id = $1")
            .bind(job_id.as_uuid())
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Terminal success: store the result verbatim, force progress to 100.
    pub async fn mark_completed(
        &self,
        job_id: JobId,
        result_data: &serde_json::Value,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', result_data = $2, progress = 100, \
             completed_at = now() WHERE job_id = $1 AND status = 'processing'",
        )
        .bind(job_id.as_uuid())
        .bind(result_data)
        .execute(&self.pool)
        .await?;

        info!(job_id = %job_id, "Job completed");
        Ok(())
    }

    /// Terminal failure: capture the error verbatim.
    ///
    /// The completion timestamp marks the end of the attempt, not success.
    /// A completed job is never clobbered.
    pub async fn mark_failed(&self, job_id: JobId, error_message: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, completed_at = now() \
             WHERE job_id = $1 AND status <> 'completed'",
        )
        .bind(job_id.as_uuid())
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        warn!(job_id = %job_id, error = %error_message, "Job failed");
        Ok(())
    }
}
