//! Download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use futures_util::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use mp3ify_models::{JobId, JobRecord, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::security::download_filename;
use crate::state::AppState;

/// Stream the converted MP3.
///
/// After the body has been fully sent the output artifact, its expiry
/// entry and the job record are removed; the job is consumed. Aborted
/// downloads leave everything in place for a retry, and the expiry sweep
/// reclaims the artifact eventually.
pub async fn download_audio(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let id = JobId::from_string(file_id);

    let record = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if record.status != JobStatus::Completed {
        return Err(ApiError::not_found(
            "File not found or conversion not completed",
        ));
    }

    let file = tokio::fs::File::open(&record.output_path)
        .await
        .map_err(|_| ApiError::not_found("File not found or conversion not completed"))?;
    let len = file.metadata().await?.len();

    let filename = download_filename(&record.original_filename);

    // Chain the cleanup onto the end of the body stream so it runs once
    // the last chunk has been handed to the client.
    let cleanup_state = state.clone();
    let cleanup_record = record.clone();
    let tail = futures_util::stream::once(async move {
        cleanup_after_download(cleanup_state, cleanup_record).await;
        Ok::<_, std::io::Error>(axum::body::Bytes::new())
    });
    let body = Body::from_stream(ReaderStream::new(file).chain(tail));

    info!(job_id = %id, filename, "Serving converted audio");

    Response::builder()
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(body)
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Terminal removal of a consumed job: expiry retraction first, so the
/// sweep cannot race the explicit deletion.
async fn cleanup_after_download(state: AppState, record: JobRecord) {
    if let Err(e) = state.expiry.retract(&record.output_path).await {
        warn!(job_id = %record.id, "Failed to retract expiry entry: {e}");
    }
    if let Err(e) = tokio::fs::remove_file(&record.output_path).await {
        warn!(job_id = %record.id, "Failed to remove output artifact: {e}");
    }
    if let Err(e) = state.store.delete(&record.id).await {
        warn!(job_id = %record.id, "Failed to delete job record: {e}");
    }
    info!(job_id = %record.id, "Job consumed by download");
}
