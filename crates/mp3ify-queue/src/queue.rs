//! Work queue over a Redis list.

use std::time::Duration;

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mp3ify_models::JobId;

use crate::error::QueueResult;

/// Default Redis list key for queued job ids.
const DEFAULT_QUEUE_KEY: &str = "mp3ify:conversion_queue";

/// Envelope pushed onto the queue. It carries only the job id; the consumer
/// re-reads the full record so the store stays the single source of truth.
#[derive(Debug, Serialize, Deserialize)]
struct QueueEntry {
    file_id: JobId,
}

/// FIFO work queue between the upload producer and the conversion worker.
///
/// Delivery is at-least-once with no acknowledgment: an entry popped by a
/// consumer that crashes mid-job is gone, and the job stays in
/// `processing` with no recovery path. A production hardening would add
/// visibility-timeout redelivery; this implementation keeps the simpler
/// contract and relies on the atomic pop for mutual exclusion across
/// workers.
#[derive(Clone)]
pub struct ConversionQueue {
    client: redis::Client,
    queue_key: String,
}

impl ConversionQueue {
    /// Create a new queue client on the default key.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        Self::with_key(redis_url, DEFAULT_QUEUE_KEY)
    }

    /// Create a queue client on an explicit key.
    pub fn with_key(redis_url: &str, queue_key: impl Into<String>) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            queue_key: queue_key.into(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(&crate::redis_url_from_env())
    }

    /// Append a job id to the queue tail.
    pub async fn push(&self, id: &JobId) -> QueueResult<()> {
        let payload = serde_json::to_string(&QueueEntry {
            file_id: id.clone(),
        })?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.lpush::<_, _, ()>(&self.queue_key, payload).await?;
        debug!(job_id = %id, "Enqueued job");
        Ok(())
    }

    /// Block up to `timeout` waiting for the next entry. `None` means the
    /// timeout elapsed with no work, which is not an error.
    pub async fn pop(&self, timeout: Duration) -> QueueResult<Option<JobId>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: Option<(String, String)> = conn
            .brpop(&self.queue_key, timeout.as_secs_f64())
            .await?;

        let Some((_, payload)) = reply else {
            return Ok(None);
        };

        match serde_json::from_str::<QueueEntry>(&payload) {
            Ok(entry) => {
                debug!(job_id = %entry.file_id, "Dequeued job");
                Ok(Some(entry.file_id))
            }
            Err(e) => {
                // The malformed entry is consumed so it cannot wedge the queue.
                warn!("Discarding malformed queue entry: {e}");
                Ok(None)
            }
        }
    }

    /// Number of entries waiting in the queue.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.llen(&self.queue_key).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_round_trip() {
        let entry = QueueEntry {
            file_id: JobId::from_string("job-1"),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"file_id":"job-1"}"#);

        let parsed: QueueEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.file_id, entry.file_id);
    }

    #[test]
    fn test_malformed_entry_does_not_parse() {
        assert!(serde_json::from_str::<QueueEntry>("not json").is_err());
        assert!(serde_json::from_str::<QueueEntry>(r#"{"other":"field"}"#).is_err());
    }
}
