//! Redis-backed job orchestration for the mp3ify backend.
//!
//! This crate provides:
//! - The job record store (Redis hashes)
//! - The FIFO work queue (Redis list with blocking pop)
//! - The artifact expiry index (Redis sorted set)
//! - Per-job status updates via Redis Pub/Sub
//! - The producer that ties submission together

pub mod error;
pub mod expiry;
pub mod producer;
pub mod progress;
pub mod queue;
pub mod records;

pub use error::{QueueError, QueueResult};
pub use expiry::ExpiryIndex;
pub use producer::{JobProducer, ProducerConfig};
pub use progress::ProgressChannel;
pub use queue::ConversionQueue;
pub use records::JobStore;

/// Redis URL from the environment, with the conventional local default.
pub(crate) fn redis_url_from_env() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}
