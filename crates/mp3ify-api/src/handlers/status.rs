//! Status polling handler.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use mp3ify_models::{JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Snapshot of a job for polling clients.
#[derive(Serialize)]
pub struct StatusResponse {
    pub file_id: String,
    pub status: JobStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub original_filename: String,
    pub created_at: String,
}

/// Report the current state of a conversion job. An id that was never
/// submitted yields 404, which is distinct from every status value.
pub async fn get_conversion_status(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let id = JobId::from_string(file_id);
    let record = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(StatusResponse {
        file_id: record.id.to_string(),
        status: record.status,
        progress: record.progress,
        message: record.message,
        original_filename: record.original_filename,
        created_at: record.created_at.to_rfc3339(),
    }))
}
