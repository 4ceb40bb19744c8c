//! Status update messages.
//!
//! The same envelope is published on the progress channel and forwarded to
//! WebSocket observers, so remote clients see exactly what the worker
//! reported.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobRecord};
use crate::status::JobStatus;

/// One status update for one job.
///
/// Delivery is fire-and-forget: updates are never buffered, and observers
/// must tolerate duplicates and apparently regressing progress values from
/// coarse converter markers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusUpdate {
    /// Job the update belongs to
    pub file_id: JobId,
    /// Status at the time of the update
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: f64,
    /// Human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the update was produced
    pub timestamp: DateTime<Utc>,
}

impl StatusUpdate {
    /// Create a status update. Progress is clamped to [0, 100].
    pub fn new(file_id: JobId, status: JobStatus, progress: f64, message: Option<String>) -> Self {
        Self {
            file_id,
            status,
            progress: progress.clamp(0.0, 100.0),
            message,
            timestamp: Utc::now(),
        }
    }

    /// Snapshot of a record's current state.
    pub fn from_record(record: &JobRecord) -> Self {
        Self::new(
            record.id.clone(),
            record.status,
            record.progress,
            record.message.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_serialization() {
        let update = StatusUpdate::new(
            JobId::from_string("job-1"),
            JobStatus::Processing,
            50.0,
            Some("Converting: 50.0%".into()),
        );

        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"file_id\":\"job-1\""));
        assert!(json.contains("\"status\":\"processing\""));
        assert!(json.contains("\"progress\":50.0"));
    }

    #[test]
    fn test_progress_is_clamped() {
        let update = StatusUpdate::new(JobId::new(), JobStatus::Processing, 250.0, None);
        assert_eq!(update.progress, 100.0);
    }

    #[test]
    fn test_message_is_omitted_when_absent() {
        let update = StatusUpdate::new(JobId::new(), JobStatus::Queued, 0.0, None);
        let json = serde_json::to_string(&update).unwrap();
        assert!(!json.contains("message"));
    }
}
