//! Media tree layout and streaming writes.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use capgen_models::JobId;

use crate::error::{StorageError, StorageResult};

/// Local filesystem media store.
///
/// Layout:
/// ```text
/// <root>/users/<user_id>/clients/<client_id>/uploads/<job_id>.<ext>
/// <root>/users/<user_id>/clients/<client_id>/audio/<job_id>.mp3
/// ```
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from the `MEDIA_ROOT` environment variable.
    pub fn from_env() -> Self {
        let root = std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn client_dir(&self, user_id: Uuid, client_id: i64) -> PathBuf {
        self.root
            .join("users")
            .join(user_id.to_string())
            .join("clients")
            .join(client_id.to_string())
    }

    /// Destination path for an upload, named by the job id.
    pub fn upload_path(&self, user_id: Uuid, client_id: i64, job_id: JobId, ext: &str) -> PathBuf {
        self.client_dir(user_id, client_id)
            .join("uploads")
            .join(format!("{}.{}", job_id, ext))
    }

    /// Destination path for the audio track extracted from a video upload.
    pub fn converted_audio_path(&self, user_id: Uuid, client_id: i64, job_id: JobId) -> PathBuf {
        self.client_dir(user_id, client_id)
            .join("audio")
            .join(format!("{}.mp3", job_id))
    }

    /// Write uploaded bytes to `path`, creating parent directories.
    pub async fn save_upload(&self, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        debug!(path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(())
    }

    /// Best-effort removal; a missing file is not an error.
    pub async fn remove_quietly(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
        }
    }
}

/// Extract and sanitize the extension of an uploaded file name.
///
/// Rejects names without an extension and strips anything that is not
/// alphanumeric, which also blocks path traversal through the extension.
pub fn file_extension(filename: &str) -> StorageResult<String> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| StorageError::invalid_file_name(filename))?;

    let cleaned: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if cleaned.is_empty() {
        return Err(StorageError::invalid_file_name(filename));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let store = MediaStore::new("/data/media");
        let user = Uuid::new_v4();
        let job = JobId::new();

        let upload = store.upload_path(user, 7, job, "mp4");
        let expected = format!("/data/media/users/{}/clients/7/uploads/{}.mp4", user, job);
        assert_eq!(upload.to_string_lossy(), expected);

        let audio = store.converted_audio_path(user, 7, job);
        assert!(audio.to_string_lossy().ends_with(&format!("audio/{}.mp3", job)));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("video.MP4").unwrap(), "mp4");
        assert_eq!(file_extension("a.b.wav").unwrap(), "wav");
        assert!(file_extension("noext").is_err());
        assert!(file_extension("weird.!!").is_err());
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let path = store.upload_path(Uuid::new_v4(), 1, JobId::new(), "mp3");

        store.save_upload(&path, b"abc").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"abc");

        store.remove_quietly(&path).await;
        assert!(!path.exists());

        // Removing again is a no-op
        store.remove_quietly(&path).await;
    }
}
