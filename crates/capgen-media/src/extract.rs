//! Video to audio extraction.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Conversion cap; a video that takes longer than this is failed.
pub const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 300;

/// Extract the audio track of `input` into `output` as mp3 (192k, 44.1 kHz).
///
/// Returns the output path on success. Timeouts and converter failures
/// carry the tool's own error text for verbatim persistence on the job.
pub async fn extract_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    timeout_secs: u64,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::input_not_found(input.to_string_lossy()));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }

    let cmd = FfmpegCommand::new(input, output)
        .no_video()
        .audio_codec("libmp3lame")
        .audio_bitrate("192k")
        .sample_rate(44100);

    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await?;

    // FFmpeg can exit zero without producing output for streams with no audio
    if !output.exists() {
        return Err(MediaError::conversion_failed(
            "No audio track produced",
            None,
        ));
    }

    let size = fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
    info!(
        input = %input.display(),
        output = %output.display(),
        size,
        "Extracted audio track"
    );

    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_audio(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp3"),
            DEFAULT_CONVERSION_TIMEOUT_SECS,
        )
        .await;

        assert!(matches!(result, Err(MediaError::InputNotFound(_))));
    }
}
