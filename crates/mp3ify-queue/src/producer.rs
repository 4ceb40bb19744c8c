//! Job submission.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use mp3ify_models::{JobId, JobRecord};

use crate::error::{QueueError, QueueResult};
use crate::expiry::ExpiryIndex;
use crate::queue::ConversionQueue;
use crate::records::JobStore;

/// Producer configuration.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Directory converted artifacts are written to
    pub output_dir: PathBuf,
    /// How long uploaded and converted artifacts are retained
    pub retention: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/tmp/uploads"),
            retention: Duration::from_secs(24 * 3600),
        }
    }
}

impl ProducerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_dir: std::env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/uploads")),
            retention: Duration::from_secs(
                std::env::var("FILE_RETENTION_HOURS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(24)
                    * 3600,
            ),
        }
    }
}

/// Accepts conversion requests.
///
/// `submit` creates the job record, enqueues the id and registers both
/// artifacts for expiry before returning, so the caller may treat the job
/// as durably queued once it has the id.
pub struct JobProducer {
    store: JobStore,
    queue: ConversionQueue,
    expiry: ExpiryIndex,
    config: ProducerConfig,
}

impl JobProducer {
    /// Create a new producer over existing clients.
    pub fn new(
        store: JobStore,
        queue: ConversionQueue,
        expiry: ExpiryIndex,
        config: ProducerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            expiry,
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Ok(Self::new(
            JobStore::from_env()?,
            ConversionQueue::from_env()?,
            ExpiryIndex::from_env()?,
            ProducerConfig::from_env(),
        ))
    }

    /// Output location for a job. Derived from the id alone, never from the
    /// client-supplied name.
    pub fn output_path(&self, id: &JobId) -> PathBuf {
        self.config.output_dir.join(format!("{id}.mp3"))
    }

    /// Submit a conversion request for an already-stored upload.
    pub async fn submit(&self, original_filename: &str, input_path: &Path) -> QueueResult<JobRecord> {
        if original_filename.trim().is_empty() {
            return Err(QueueError::validation("original filename must not be empty"));
        }
        if input_path.as_os_str().is_empty() {
            return Err(QueueError::validation("input path must not be empty"));
        }

        let id = JobId::new();
        let output_path = self.output_path(&id);
        let record = JobRecord::new(
            id.clone(),
            original_filename,
            input_path.to_string_lossy(),
            output_path.to_string_lossy(),
        );

        self.store.put(&record).await?;
        self.queue.push(&id).await?;

        let deadline = Utc::now() + chrono::Duration::seconds(self.config.retention.as_secs() as i64);
        self.expiry.schedule(&record.input_path, deadline).await?;
        self.expiry.schedule(&record.output_path, deadline).await?;

        info!(job_id = %id, original_filename, "Job submitted");
        Ok(record)
    }
}
