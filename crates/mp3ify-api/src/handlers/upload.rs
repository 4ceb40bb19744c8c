//! Upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use mp3ify_queue::QueueError;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::media_extension;
use crate::state::AppState;

/// Response for an accepted conversion job.
#[derive(Serialize)]
pub struct ConversionResponse {
    pub file_id: String,
    pub status: String,
    pub message: String,
}

/// Accept a media upload and queue it for conversion.
///
/// The file is streamed to disk in chunks; only then is the job submitted,
/// so a returned id always refers to a fully stored input artifact.
pub async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::bad_request("Missing filename"))?;

        let Some(ext) = media_extension(&original) else {
            return Err(ApiError::bad_request("Invalid video format"));
        };

        tokio::fs::create_dir_all(&state.config.storage_path).await?;

        // The stored name comes from a fresh upload id, never from the
        // client-supplied filename.
        let upload_id = Uuid::new_v4();
        let input_path = state.config.storage_path.join(format!("{upload_id}{ext}"));

        let mut file = tokio::fs::File::create(&input_path).await?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::bad_request(format!("Upload interrupted: {e}")))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        let record = match state.producer.submit(&original, &input_path).await {
            Ok(record) => record,
            Err(e) => {
                // The job was never created; don't leave the upload behind.
                let _ = tokio::fs::remove_file(&input_path).await;
                return Err(match e {
                    QueueError::Validation(msg) => ApiError::bad_request(msg),
                    other => ApiError::from(other),
                });
            }
        };

        metrics::record_job_enqueued();
        info!(job_id = %record.id, original = %original, "Upload accepted");

        return Ok(Json(ConversionResponse {
            file_id: record.id.to_string(),
            status: record.status.as_str().to_string(),
            message: "File uploaded successfully and queued for conversion".to_string(),
        }));
    }

    Err(ApiError::bad_request("Missing file field"))
}
