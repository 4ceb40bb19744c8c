//! Progress events via Redis Pub/Sub.

use std::pin::Pin;

use futures_util::Stream;
use redis::AsyncCommands;
use tracing::debug;

use mp3ify_models::{JobId, JobStatus, StatusUpdate};

use crate::error::QueueResult;

/// Channel for publishing/subscribing to per-job status updates.
///
/// Subscriptions are keyed by job id, not by connection, so any number of
/// observers may watch the same job. Publishing with no subscriber is a
/// no-op; nothing is buffered for late subscribers.
#[derive(Clone)]
pub struct ProgressChannel {
    client: redis::Client,
}

impl ProgressChannel {
    /// Create a new progress channel.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(&crate::redis_url_from_env())
    }

    /// Get the channel name for a job.
    pub fn channel_name(job_id: &JobId) -> String {
        format!("mp3ify:progress:{job_id}")
    }

    /// Publish a status update.
    pub async fn publish(&self, update: &StatusUpdate) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&update.file_id);
        let payload = serde_json::to_string(update)?;

        debug!(job_id = %update.file_id, "Publishing status update to {channel}");
        conn.publish::<_, _, ()>(channel, payload).await?;

        Ok(())
    }

    /// Publish a status snapshot for a job.
    pub async fn status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        progress: f64,
        message: Option<String>,
    ) -> QueueResult<()> {
        self.publish(&StatusUpdate::new(job_id.clone(), status, progress, message))
            .await
    }

    /// Subscribe to status updates for a job.
    /// Returns a pinned stream that can be polled with `.next()`; dropping
    /// the stream tears the subscription down.
    pub async fn subscribe(
        &self,
        job_id: &JobId,
    ) -> QueueResult<Pin<Box<dyn Stream<Item = StatusUpdate> + Send>>> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(Self::channel_name(job_id)).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_naming() {
        let id = JobId::from_string("job-9");
        assert_eq!(ProgressChannel::channel_name(&id), "mp3ify:progress:job-9");
    }
}
