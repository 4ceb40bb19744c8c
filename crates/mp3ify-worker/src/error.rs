//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Queue error: {0}")]
    Queue(#[from] mp3ify_queue::QueueError),

    #[error("Media error: {0}")]
    Media(#[from] mp3ify_media::MediaError),

    #[error("Record error: {0}")]
    Record(#[from] mp3ify_models::RecordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
