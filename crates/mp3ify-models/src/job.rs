//! Job records and the conversion state machine.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::status::JobStatus;

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from record parsing and state transitions.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("missing record field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for field {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// A single conversion request, stored as a hash of text scalars keyed by
/// job id.
///
/// `status` only moves through the transition methods
/// (`queued -> processing -> {completed, failed}`); there is no other way
/// to advance it, so an unreachable state cannot be written.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    #[serde(rename = "file_id")]
    pub id: JobId,

    /// Client-supplied name, used only to derive the download filename
    pub original_filename: String,

    /// Location of the uploaded artifact
    pub input_path: String,

    /// Location the converted artifact is written to
    pub output_path: String,

    /// Current status
    pub status: JobStatus,

    /// Progress percentage (0-100)
    pub progress: f64,

    /// Human-readable status detail, last write wins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new queued record.
    pub fn new(
        id: JobId,
        original_filename: impl Into<String>,
        input_path: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            id,
            original_filename: original_filename.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            status: JobStatus::Queued,
            progress: 0.0,
            message: None,
            created_at: Utc::now(),
        }
    }

    /// Begin processing. Progress restarts at zero.
    pub fn start(&mut self) -> Result<(), RecordError> {
        self.transition(JobStatus::Processing)?;
        self.progress = 0.0;
        self.message = Some("Starting conversion".to_string());
        Ok(())
    }

    /// Mark the conversion as completed. Progress is forced to 100.
    pub fn complete(&mut self) -> Result<(), RecordError> {
        self.transition(JobStatus::Completed)?;
        self.progress = 100.0;
        self.message = Some("Conversion completed".to_string());
        Ok(())
    }

    /// Mark the conversion as failed. Progress keeps its last known value.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), RecordError> {
        self.transition(JobStatus::Failed)?;
        self.message = Some(message.into());
        Ok(())
    }

    /// Update progress within a processing run. Values are clamped to
    /// [0, 100]; duplicate or regressing marker values are tolerated.
    pub fn set_progress(&mut self, progress: f64, message: Option<String>) {
        self.progress = progress.clamp(0.0, 100.0);
        if let Some(message) = message {
            self.message = Some(message);
        }
    }

    /// Check if the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), RecordError> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        );
        if !allowed {
            return Err(RecordError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Serialize to text scalars for hash storage.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("file_id", self.id.to_string()),
            ("original_filename", self.original_filename.clone()),
            ("input_path", self.input_path.clone()),
            ("output_path", self.output_path.clone()),
            ("status", self.status.as_str().to_string()),
            ("progress", self.progress.to_string()),
            ("created_at", self.created_at.to_rfc3339()),
        ];
        if let Some(message) = &self.message {
            fields.push(("message", message.clone()));
        }
        fields
    }

    /// Rebuild a record from stored text scalars.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, RecordError> {
        let get = |name: &'static str| {
            fields
                .get(name)
                .cloned()
                .ok_or(RecordError::MissingField(name))
        };

        let status_raw = get("status")?;
        let status = status_raw
            .parse::<JobStatus>()
            .map_err(|_| RecordError::InvalidField {
                field: "status",
                value: status_raw.clone(),
            })?;

        let progress = match fields.get("progress") {
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| RecordError::InvalidField {
                    field: "progress",
                    value: raw.clone(),
                })?
                .clamp(0.0, 100.0),
            None => 0.0,
        };

        let created_raw = get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_raw)
            .map_err(|_| RecordError::InvalidField {
                field: "created_at",
                value: created_raw.clone(),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: JobId::from_string(get("file_id")?),
            original_filename: get("original_filename")?,
            input_path: get("input_path")?,
            output_path: get("output_path")?,
            status,
            progress,
            message: fields.get("message").cloned(),
            created_at,
        })
    }
}
