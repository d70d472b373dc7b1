//! Media error types.

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Conversion timeout (>{0} seconds)")]
    Timeout(u64),

    #[error("Conversion failed: {stderr}")]
    ConversionFailed {
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn input_not_found(path: impl Into<String>) -> Self {
        Self::InputNotFound(path.into())
    }

    pub fn conversion_failed(stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ConversionFailed {
            stderr: stderr.into(),
            exit_code,
        }
    }
}
