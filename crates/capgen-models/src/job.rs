//! Content-generation jobs and their state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Externally visible job identifier (not the primary key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// File stored, generation not requested yet
    #[default]
    Uploaded,
    /// Queued, awaiting worker pickup
    Pending,
    /// Worker actively running the pipeline
    Processing,
    /// Terminal success
    Completed,
    /// Terminal error; re-enterable into Pending via generate
    Failed,
}

impl JobStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(JobStatus::Uploaded),
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Generation may only be requested from these states.
    pub fn can_request_generation(&self) -> bool {
        matches!(self, JobStatus::Uploaded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Audio,
    Video,
    Image,
}

impl FileType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(FileType::Audio),
            "video" => Some(FileType::Video),
            "image" => Some(FileType::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Audio => "audio",
            FileType::Video => "video",
            FileType::Image => "image",
        }
    }

    /// Classify an uploaded file by its extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" | "wav" | "m4a" | "aac" | "ogg" | "flac" => Some(FileType::Audio),
            "mp4" | "mov" | "avi" | "mkv" | "webm" => Some(FileType::Video),
            "jpg" | "jpeg" | "png" | "webp" | "gif" => Some(FileType::Image),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested length of a generated text section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthPreset {
    Short,
    #[default]
    Medium,
    Long,
}

impl LengthPreset {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short" => Some(LengthPreset::Short),
            "medium" => Some(LengthPreset::Medium),
            "long" => Some(LengthPreset::Long),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LengthPreset::Short => "short",
            LengthPreset::Medium => "medium",
            LengthPreset::Long => "long",
        }
    }
}

impl fmt::Display for LengthPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hashtag count bounds enforced at generation time.
pub const MIN_HASHTAG_COUNT: u32 = 5;
pub const MAX_HASHTAG_COUNT: u32 = 30;
pub const DEFAULT_HASHTAG_COUNT: u32 = 15;

/// Parameters controlling the generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub caption_length: LengthPreset,
    pub description_length: LengthPreset,
    pub hashtag_count: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            caption_length: LengthPreset::Medium,
            description_length: LengthPreset::Medium,
            hashtag_count: DEFAULT_HASHTAG_COUNT,
        }
    }
}

impl GenerationParams {
    /// Clamp the hashtag count into its allowed range.
    pub fn clamped(mut self) -> Self {
        self.hashtag_count = self
            .hashtag_count
            .clamp(MIN_HASHTAG_COUNT, MAX_HASHTAG_COUNT);
        self
    }
}

/// A tracked unit of upload-to-generated-content work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Database primary key
    pub id: i64,

    /// External handle used in API routes and queue payloads
    pub job_id: JobId,

    pub user_id: Uuid,

    pub client_id: i64,

    pub file_type: FileType,

    pub original_filename: String,

    /// Path to the stored upload
    pub file_path: String,

    /// Path to the extracted audio track (video jobs only)
    pub converted_audio_path: Option<String>,

    pub status: JobStatus,

    /// Progress percentage, 0-100, monotonically non-decreasing
    pub progress: i32,

    pub params: GenerationParams,

    /// Generated content payload, stored verbatim on completion
    pub result_data: Option<serde_json::Value>,

    /// Error text captured verbatim on failure
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub started_at: Option<DateTime<Utc>>,

    /// End of the last attempt (set on completion and on failure)
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Total processing time of the last attempt, in seconds.
    pub fn processing_time_secs(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Uploaded,
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_generation_allowed_states() {
        assert!(JobStatus::Uploaded.can_request_generation());
        assert!(JobStatus::Failed.can_request_generation());
        assert!(!JobStatus::Pending.can_request_generation());
        assert!(!JobStatus::Processing.can_request_generation());
        assert!(!JobStatus::Completed.can_request_generation());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_file_type_classification() {
        assert_eq!(FileType::from_extension("mp3"), Some(FileType::Audio));
        assert_eq!(FileType::from_extension("MP4"), Some(FileType::Video));
        assert_eq!(FileType::from_extension("jpeg"), Some(FileType::Image));
        assert_eq!(FileType::from_extension("pdf"), None);
    }

    #[test]
    fn test_params_clamp() {
        let params = GenerationParams {
            hashtag_count: 100,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.hashtag_count, MAX_HASHTAG_COUNT);

        let params = GenerationParams {
            hashtag_count: 1,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.hashtag_count, MIN_HASHTAG_COUNT);

        let params = GenerationParams::default().clamped();
        assert_eq!(params.hashtag_count, DEFAULT_HASHTAG_COUNT);
    }
}
