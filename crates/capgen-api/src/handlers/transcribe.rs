//! Upload, generation, and job polling endpoints.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use capgen_db::NewJob;
use capgen_models::{FileType, GenerationParams, Job, JobId, JobStatus, LengthPreset};
use capgen_queue::GenerateContentJob;
use capgen_storage::store::file_extension;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::LIMIT_REACHED_MESSAGE;
use crate::state::AppState;

/// Billable action name recorded on the credit ledger.
const CREDIT_ACTION_GENERATION: &str = "content_generation";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub job_id: Uuid,
    pub caption_length: Option<String>,
    pub description_length: Option<String>,
    pub hashtag_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub client_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub job_id: Uuid,
    pub file_type: String,
    pub original_filename: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub job_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub client_id: i64,
    pub file_type: String,
    pub original_filename: String,
    pub status: String,
    pub progress: i32,
    pub caption_length: String,
    pub description_length: String,
    pub hashtag_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_secs: Option<f64>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id.as_uuid(),
            client_id: job.client_id,
            file_type: job.file_type.as_str().to_string(),
            original_filename: job.original_filename.clone(),
            status: job.status.as_str().to_string(),
            progress: job.progress,
            caption_length: job.params.caption_length.as_str().to_string(),
            description_length: job.params.description_length.as_str().to_string(),
            hashtag_count: job.params.hashtag_count,
            result_data: job.result_data.clone(),
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            processing_time_secs: job.processing_time_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub success: bool,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
    pub jobs: Vec<JobView>,
}

/// Parsed multipart upload form.
#[derive(Debug, Default)]
struct UploadForm {
    client_id: Option<i64>,
    file_name: Option<String>,
    file_bytes: Option<Vec<u8>>,
    caption_length: Option<String>,
    description_length: Option<String>,
    hashtag_count: Option<u32>,
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart request: {e}")))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("client_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid client_id field: {e}")))?;
                form.client_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("client_id must be an integer"))?,
                );
            }
            Some("file") => {
                form.file_name = field.file_name().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
                form.file_bytes = Some(bytes.to_vec());
            }
            Some("caption_length") => {
                form.caption_length = Some(field.text().await.unwrap_or_default());
            }
            Some("description_length") => {
                form.description_length = Some(field.text().await.unwrap_or_default());
            }
            Some("hashtag_count") => {
                let text = field.text().await.unwrap_or_default();
                form.hashtag_count = text.trim().parse().ok();
            }
            _ => {}
        }
    }

    Ok(form)
}

fn parse_length(value: Option<&str>, fallback: LengthPreset) -> ApiResult<LengthPreset> {
    match value {
        None => Ok(fallback),
        Some(s) => LengthPreset::parse(s).ok_or_else(|| {
            ApiError::bad_request("Length must be one of 'short', 'medium', 'long'")
        }),
    }
}

/// Store the uploaded bytes and create the job row in `uploaded`.
async fn store_upload(
    state: &AppState,
    user: &AuthUser,
    form: &UploadForm,
    params: GenerationParams,
) -> ApiResult<Job> {
    let client_id = form
        .client_id
        .ok_or_else(|| ApiError::bad_request("client_id is required"))?;
    let file_name = form
        .file_name
        .clone()
        .ok_or_else(|| ApiError::bad_request("file is required"))?;
    let bytes = form
        .file_bytes
        .as_deref()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::bad_request("Uploaded file is empty"))?;

    // Ownership check before any bytes hit disk
    state
        .clients()
        .find_for_user(client_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client not found"))?;

    let ext = file_extension(&file_name)
        .map_err(|_| ApiError::bad_request("File name has no usable extension"))?;
    let file_type = FileType::from_extension(&ext).ok_or_else(|| {
        ApiError::bad_request("Unsupported file type. Upload audio, video, or image files.")
    })?;

    let job_id = JobId::new();
    let path = state.storage.upload_path(user.id, client_id, job_id, &ext);
    state.storage.save_upload(&path, bytes).await?;

    let job = state
        .jobs()
        .create(NewJob {
            job_id,
            user_id: user.id,
            client_id,
            file_type,
            original_filename: file_name,
            file_path: path.to_string_lossy().to_string(),
            params,
            status: JobStatus::Uploaded,
        })
        .await;

    // Don't leave an orphaned file if the row failed to insert
    match job {
        Ok(job) => Ok(job),
        Err(e) => {
            state.storage.remove_quietly(&path).await;
            Err(e.into())
        }
    }
}

/// Charge credit and move a job into the queue.
///
/// Order matters: the state gate rejects first (free, no charge), then the
/// credit check-and-charge runs, then the conditional transition claims the
/// job. Only after the row is `pending` does the message get enqueued.
async fn begin_generation(
    state: &AppState,
    user: &AuthUser,
    job: &Job,
    params: GenerationParams,
) -> ApiResult<()> {
    if !job.status.can_request_generation() {
        return Err(ApiError::bad_request(format!(
            "Job cannot be generated from status '{}'. Only uploaded or failed jobs can be generated.",
            job.status
        )));
    }

    let outcome = state
        .credit_service()
        .use_credit(
            user.id,
            CREDIT_ACTION_GENERATION,
            Some(&format!("Generation for job {}", job.job_id)),
        )
        .await?;

    if !outcome.allowed {
        return Err(ApiError::bad_request(LIMIT_REACHED_MESSAGE));
    }

    let queued = state.jobs().try_mark_pending(job.job_id, params).await?;
    if !queued {
        // A concurrent request won the transition after we charged
        warn!(job_id = %job.job_id, "Generation transition lost after credit charge");
        return Err(ApiError::bad_request(
            "Job is already queued or processing.",
        ));
    }

    state
        .queue
        .enqueue(&GenerateContentJob::new(job.job_id, user.id))
        .await?;

    metrics::record_job_enqueued(job.file_type.as_str());
    info!(job_id = %job.job_id, user_id = %user.id, "Generation queued");
    Ok(())
}

fn merged_params(
    base: GenerationParams,
    caption: Option<&str>,
    description: Option<&str>,
    hashtags: Option<u32>,
) -> ApiResult<GenerationParams> {
    Ok(GenerationParams {
        caption_length: parse_length(caption, base.caption_length)?,
        description_length: parse_length(description, base.description_length)?,
        hashtag_count: hashtags.unwrap_or(base.hashtag_count),
    }
    .clamped())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/transcribe/upload-file
///
/// Multipart `client_id` + `file`. Stores the file and creates the job in
/// `uploaded`; no credit is charged until generation is requested.
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_upload_form(multipart).await?;
    let job = store_upload(&state, &user, &form, GenerationParams::default()).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            message: "File uploaded successfully. Call generate to start processing.".to_string(),
            job_id: job.job_id.as_uuid(),
            file_type: job.file_type.as_str().to_string(),
            original_filename: job.original_filename,
            status: job.status.as_str().to_string(),
        }),
    ))
}

/// POST /api/transcribe/generate
///
/// Charges one credit and transitions `uploaded|failed -> pending`.
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let job = state
        .jobs()
        .find_for_user(JobId::from(body.job_id), user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let params = merged_params(
        job.params,
        body.caption_length.as_deref(),
        body.description_length.as_deref(),
        body.hashtag_count,
    )?;

    begin_generation(&state, &user, &job, params).await?;

    Ok(Json(GenerateResponse {
        success: true,
        message: "Content generation started.".to_string(),
        job_id: job.job_id.as_uuid(),
        status: JobStatus::Pending.as_str().to_string(),
    }))
}

/// POST /api/transcribe/upload
///
/// Legacy combined upload + generate in a single multipart call.
pub async fn upload_and_generate(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_upload_form(multipart).await?;

    let params = merged_params(
        GenerationParams::default(),
        form.caption_length.as_deref(),
        form.description_length.as_deref(),
        form.hashtag_count,
    )?;

    let job = store_upload(&state, &user, &form, params).await?;
    begin_generation(&state, &user, &job, params).await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            success: true,
            message: "File uploaded and content generation started.".to_string(),
            job_id: job.job_id.as_uuid(),
            status: JobStatus::Pending.as_str().to_string(),
        }),
    ))
}

/// GET /api/transcribe/job/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Json<JobView>> {
    let job = state
        .jobs()
        .find_for_user(JobId::from(job_id), user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job.into()))
}

/// GET /api/transcribe/jobs?limit&offset&client_id
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
    user: AuthUser,
) -> ApiResult<Json<JobListResponse>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let jobs = state
        .jobs()
        .list_for_user(user.id, query.client_id, limit, offset)
        .await?;
    let jobs: Vec<JobView> = jobs.into_iter().map(Into::into).collect();

    Ok(Json(JobListResponse {
        success: true,
        count: jobs.len(),
        limit,
        offset,
        jobs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_params_defaults() {
        let params = merged_params(GenerationParams::default(), None, None, None).unwrap();
        assert_eq!(params, GenerationParams::default());
    }

    #[test]
    fn test_merged_params_overrides_and_clamps() {
        let params = merged_params(
            GenerationParams::default(),
            Some("short"),
            Some("long"),
            Some(99),
        )
        .unwrap();
        assert_eq!(params.caption_length, LengthPreset::Short);
        assert_eq!(params.description_length, LengthPreset::Long);
        assert_eq!(params.hashtag_count, 30);
    }

    #[test]
    fn test_merged_params_rejects_unknown_preset() {
        let result = merged_params(GenerationParams::default(), Some("huge"), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_job_view_serializes_without_empty_fields() {
        let job = Job {
            id: 1,
            job_id: JobId::new(),
            user_id: Uuid::new_v4(),
            client_id: 2,
            file_type: FileType::Audio,
            original_filename: "a.mp3".to_string(),
            file_path: "/tmp/a.mp3".to_string(),
            converted_audio_path: None,
            status: JobStatus::Uploaded,
            progress: 0,
            params: GenerationParams::default(),
            result_data: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };

        let value = serde_json::to_value(JobView::from(job)).unwrap();
        assert!(value.get("result_data").is_none());
        assert!(value.get("error_message").is_none());
        assert_eq!(value["status"], "uploaded");
    }
}
