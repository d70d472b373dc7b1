//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Database error: {0}")]
    Db(#[from] capgen_db::DbError),

    #[error("Media error: {0}")]
    Media(#[from] capgen_media::MediaError),

    #[error("ML error: {0}")]
    Ml(#[from] capgen_ml_client::MlError),

    #[error("Queue error: {0}")]
    Queue(#[from] capgen_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] capgen_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Whether a queue-level retry has a chance of succeeding.
    ///
    /// Media failures (bad input, conversion timeout) and pipeline-reported
    /// API errors are job failures, not infrastructure faults: retrying
    /// the same input will not fix them.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Db(_) | WorkerError::Queue(_) => true,
            WorkerError::Ml(e) => e.is_retryable(),
            WorkerError::JobFailed(_)
            | WorkerError::Media(_)
            | WorkerError::Storage(_)
            | WorkerError::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capgen_media::MediaError;
    use capgen_ml_client::MlError;

    #[test]
    fn test_media_failures_are_not_retryable() {
        let err = WorkerError::from(MediaError::Timeout(300));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_side_ml_errors_are_retryable() {
        assert!(WorkerError::from(MlError::api(503, "overloaded")).is_retryable());
        assert!(!WorkerError::from(MlError::api(400, "bad request")).is_retryable());
    }
}
