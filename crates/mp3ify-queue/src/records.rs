//! Job record store over Redis hashes.

use std::collections::HashMap;

use redis::AsyncCommands;
use tracing::debug;

use mp3ify_models::{JobId, JobRecord};

use crate::error::QueueResult;

/// Key prefix for job record hashes.
const JOB_KEY_PREFIX: &str = "mp3ify:job:";

/// Client for the job record store.
///
/// Records are Redis hashes of text scalars, one per job id. There is no
/// field-level locking: the producer writes the initial record exactly
/// once, and the worker owns every later status/progress/message write.
#[derive(Clone)]
pub struct JobStore {
    client: redis::Client,
}

impl JobStore {
    /// Create a new store client.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(&crate::redis_url_from_env())
    }

    fn key(id: &JobId) -> String {
        format!("{JOB_KEY_PREFIX}{id}")
    }

    /// Write the full record. Used by the producer at creation time.
    pub async fn put(&self, record: &JobRecord) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let fields = record.to_fields();
        conn.hset_multiple::<_, _, _, ()>(Self::key(&record.id), &fields)
            .await?;
        debug!(job_id = %record.id, "Stored job record");
        Ok(())
    }

    /// Fetch a record. An absent hash is the distinct "not found" state,
    /// not a status value.
    pub async fn get(&self, id: &JobId) -> QueueResult<Option<JobRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let fields: HashMap<String, String> = conn.hgetall(Self::key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(JobRecord::from_fields(&fields)?))
    }

    /// Remove a record entirely.
    pub async fn delete(&self, id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::key(id)).await?;
        debug!(job_id = %id, "Deleted job record");
        Ok(())
    }

    /// Persist the status fields after a state transition.
    pub async fn write_transition(&self, record: &JobRecord) -> QueueResult<()> {
        let mut fields = vec![
            ("status", record.status.as_str().to_string()),
            ("progress", record.progress.to_string()),
        ];
        if let Some(message) = &record.message {
            fields.push(("message", message.clone()));
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.hset_multiple::<_, _, _, ()>(Self::key(&record.id), &fields)
            .await?;
        debug!(job_id = %record.id, status = %record.status, "Persisted status transition");
        Ok(())
    }

    /// Persist a progress marker without touching `status`. This is the
    /// high-frequency path during a conversion.
    pub async fn write_progress(&self, id: &JobId, progress: f64, message: &str) -> QueueResult<()> {
        let fields = [
            ("progress", progress.clamp(0.0, 100.0).to_string()),
            ("message", message.to_string()),
        ];

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.hset_multiple::<_, _, _, ()>(Self::key(id), &fields)
            .await?;
        Ok(())
    }

    /// Round-trip to Redis, for readiness probes.
    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespacing() {
        let id = JobId::from_string("abc-123");
        assert_eq!(JobStore::key(&id), "mp3ify:job:abc-123");
    }
}
