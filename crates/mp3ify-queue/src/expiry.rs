//! Time-ordered index of artifacts due for deletion.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::debug;

use crate::error::QueueResult;

/// Default Redis sorted-set key for artifact expiry deadlines.
const DEFAULT_EXPIRY_KEY: &str = "mp3ify:file_expiry";

/// Sorted-set index of artifact paths scored by their deletion deadline.
///
/// Entries leave the index in one of two ways: the sweep deletes the
/// artifact once the deadline passes, or the owner retracts the entry
/// after consuming the artifact early.
#[derive(Clone)]
pub struct ExpiryIndex {
    client: redis::Client,
    expiry_key: String,
}

impl ExpiryIndex {
    /// Create a new index client on the default key.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        Self::with_key(redis_url, DEFAULT_EXPIRY_KEY)
    }

    /// Create an index client on an explicit key.
    pub fn with_key(redis_url: &str, expiry_key: impl Into<String>) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            expiry_key: expiry_key.into(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(&crate::redis_url_from_env())
    }

    /// Register an artifact for deletion at `deadline`.
    pub async fn schedule(&self, path: &str, deadline: DateTime<Utc>) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.zadd::<_, _, _, ()>(&self.expiry_key, path, deadline.timestamp() as f64)
            .await?;
        debug!(path, deadline = %deadline, "Scheduled artifact for deletion");
        Ok(())
    }

    /// All artifact paths whose deadline is at or before `now`.
    pub async fn due(&self, now: DateTime<Utc>) -> QueueResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let paths: Vec<String> = conn
            .zrangebyscore(&self.expiry_key, "-inf", now.timestamp() as f64)
            .await?;
        Ok(paths)
    }

    /// Drop an entry, e.g. after a download consumed the artifact early.
    pub async fn retract(&self, path: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.zrem::<_, _, ()>(&self.expiry_key, path).await?;
        debug!(path, "Retracted expiry entry");
        Ok(())
    }
}
