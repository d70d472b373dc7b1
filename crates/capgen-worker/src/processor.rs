//! The content pipeline: load, convert, transcribe, generate, store.
//!
//! Progress checkpoints: 10 job loaded, 20 conversion/analysis start,
//! 40 transcription start, 70 generation start, 90 finalizing, 100 done.

use tracing::{error, info, warn};

use capgen_db::{create_pool, DbConfig, JobRepository};
use capgen_media::extract_audio;
use capgen_ml_client::MlClient;
use capgen_models::{FileType, GeneratedContent, Job};
use capgen_queue::GenerateContentJob;
use capgen_storage::MediaStore;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Shared dependencies for job processing.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub jobs: JobRepository,
    pub storage: MediaStore,
    pub ml: MlClient,
}

impl ProcessingContext {
    /// Build the context: connection pool, media store, ML client.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let pool = create_pool(&DbConfig::from_env()).await?;
        let jobs = JobRepository::new(pool);
        let storage = MediaStore::from_env();
        let ml = MlClient::from_env()?;

        Ok(Self {
            config,
            jobs,
            storage,
            ml,
        })
    }
}

/// Process one generation message from the queue.
///
/// `allow_failed_claim` is true for redelivered messages: a queue-level
/// retry re-enters processing from the top even though the previous attempt
/// marked the job failed.
///
/// Returning `Err` signals an infrastructure fault the executor may retry;
/// job-level failures are persisted on the job and return `Ok` so the
/// message gets acked.
pub async fn process_generation(
    ctx: &ProcessingContext,
    message: &GenerateContentJob,
    allow_failed_claim: bool,
) -> WorkerResult<()> {
    let job_id = message.job_id;

    let Some(job) = ctx.jobs.find_by_job_id(job_id).await? else {
        warn!(job_id = %job_id, "Job not found, dropping message");
        return Ok(());
    };

    // CAS claim; a redundant delivery loses here and is simply acked
    let claimed = ctx
        .jobs
        .try_start_processing(job_id, allow_failed_claim)
        .await?;
    if !claimed {
        return Ok(());
    }

    info!(job_id = %job_id, file_type = %job.file_type, "Starting content pipeline");
    ctx.jobs.update_progress(job_id, 10).await?;

    if !tokio::fs::try_exists(&job.file_path).await.unwrap_or(false) {
        let msg = format!("File not found: {}", job.file_path);
        error!(job_id = %job_id, "{msg}");
        ctx.jobs.mark_failed(job_id, &msg).await?;
        return Ok(());
    }

    match run_pipeline(ctx, &job).await {
        Ok(content) => {
            ctx.jobs.update_progress(job_id, 90).await?;

            let payload = serde_json::to_value(&content)
                .map_err(|e| WorkerError::job_failed(format!("Result serialization: {e}")))?;
            ctx.jobs.mark_completed(job_id, &payload).await?;

            info!(job_id = %job_id, "Content pipeline completed");
            Ok(())
        }
        Err(e) => {
            // The job always records the failure; only infrastructure
            // faults bubble up for a queue-level retry.
            error!(job_id = %job_id, error = %e, "Content pipeline failed");
            ctx.jobs.mark_failed(job_id, &e.to_string()).await?;

            if e.is_retryable() {
                Err(e)
            } else {
                Ok(())
            }
        }
    }
}

/// Run the per-file-type pipeline and produce the content payload.
async fn run_pipeline(ctx: &ProcessingContext, job: &Job) -> WorkerResult<GeneratedContent> {
    let job_id = job.job_id;
    let params = job.params.clamped();

    match job.file_type {
        FileType::Image => {
            ctx.jobs.update_progress(job_id, 20).await?;
            ctx.jobs.update_progress(job_id, 40).await?;

            let content = ctx.ml.generate_from_image(&job.file_path, &params).await?;
            Ok(content)
        }
        FileType::Video => {
            ctx.jobs.update_progress(job_id, 20).await?;

            let audio_path =
                ctx.storage
                    .converted_audio_path(job.user_id, job.client_id, job_id);
            let audio_path = extract_audio(
                &job.file_path,
                &audio_path,
                ctx.config.conversion_timeout_secs,
            )
            .await
            .map_err(|e| {
                WorkerError::job_failed(format!("Video to audio conversion failed: {e}"))
            })?;

            ctx.jobs
                .set_converted_audio_path(job_id, &audio_path.to_string_lossy())
                .await?;

            ctx.jobs.update_progress(job_id, 40).await?;
            let transcription = ctx.ml.transcribe(&audio_path, None, true).await?;

            ctx.jobs.update_progress(job_id, 70).await?;
            let content = ctx
                .ml
                .generate_from_transcript(&transcription, &params)
                .await?;
            Ok(content)
        }
        FileType::Audio => {
            ctx.jobs.update_progress(job_id, 20).await?;

            ctx.jobs.update_progress(job_id, 40).await?;
            let transcription = ctx.ml.transcribe(&job.file_path, None, true).await?;

            ctx.jobs.update_progress(job_id, 70).await?;
            let content = ctx
                .ml
                .generate_from_transcript(&transcription, &params)
                .await?;
            Ok(content)
        }
    }
}
