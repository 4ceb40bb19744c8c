//! Single-job conversion orchestration.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use mp3ify_media::{extract_audio, probe_duration, validate_output, FfmpegProgress, FfmpegRunner};
use mp3ify_models::{JobId, JobRecord, JobStatus, StatusUpdate};
use mp3ify_queue::{ExpiryIndex, JobStore, ProgressChannel};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Buffered progress markers per job. FFmpeg can emit markers faster than
/// the Redis round-trips complete; overflow markers are dropped rather than
/// awaited, since the next marker supersedes them anyway.
const PROGRESS_BUFFER: usize = 32;

/// Shared handles the worker needs to process jobs.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub store: Arc<JobStore>,
    pub expiry: Arc<ExpiryIndex>,
    pub progress: Arc<ProgressChannel>,
}

/// Process one dequeued job id through the full state machine.
///
/// Entries whose record is missing or no longer `queued` are consumed and
/// skipped; they are never re-queued. Conversion failures are recorded on
/// the job and do not propagate.
pub async fn process_job(ctx: &WorkerContext, id: &JobId) -> WorkerResult<()> {
    let Some(mut record) = ctx.store.get(id).await? else {
        warn!(job_id = %id, "No record for dequeued job, skipping");
        return Ok(());
    };

    if record.status != JobStatus::Queued {
        warn!(job_id = %id, status = %record.status, "Dequeued job is not queued, skipping");
        return Ok(());
    }

    record.start()?;
    ctx.store.write_transition(&record).await?;
    publish_record(ctx, &record).await;

    info!(job_id = %id, input = %record.input_path, "Conversion started");

    match run_conversion(ctx, &record).await {
        Ok(output_bytes) => {
            record.complete()?;
            ctx.store.write_transition(&record).await?;
            publish_record(ctx, &record).await;
            info!(job_id = %id, output_bytes, "Conversion completed");

            // Reclaim the input; the output stays for retrieval.
            if let Err(e) = tokio::fs::remove_file(&record.input_path).await {
                warn!(job_id = %id, input = %record.input_path, "Failed to remove input artifact: {e}");
            }
        }
        Err(e) => {
            // The input artifact is left in place for inspection.
            record.fail(format!("Conversion failed: {e}"))?;
            ctx.store.write_transition(&record).await?;
            publish_record(ctx, &record).await;
            warn!(job_id = %id, "Conversion failed: {e}");
        }
    }

    Ok(())
}

/// Drive FFmpeg and stream progress markers out through the store and the
/// progress channel. Returns the output size on success.
async fn run_conversion(ctx: &WorkerContext, record: &JobRecord) -> WorkerResult<u64> {
    let total_secs = probe_duration(&record.input_path).await?;
    let total_ms = (total_secs * 1000.0) as i64;

    // Markers flow through a bounded channel into a dedicated dispatch
    // task, so FFmpeg's output pace never couples to Redis latency.
    let (tx, rx) = mpsc::channel::<FfmpegProgress>(PROGRESS_BUFFER);
    let dispatcher = tokio::spawn(dispatch_progress(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.progress),
        record.id.clone(),
        total_ms,
        rx,
    ));

    let runner = FfmpegRunner::new().with_timeout(ctx.config.conversion_timeout.as_secs());
    let result = extract_audio(&record.input_path, &record.output_path, &runner, move |p| {
        let _ = tx.try_send(p);
    })
    .await;

    // The callback owns the sender; when FFmpeg's progress stream ends the
    // channel closes and the dispatcher drains out.
    let _ = dispatcher.await;

    result?;
    let size = validate_output(&record.output_path).await?;
    Ok(size)
}

/// Drain progress markers and republish them, one store write and one
/// publish per marker.
async fn dispatch_progress(
    store: Arc<JobStore>,
    progress: Arc<ProgressChannel>,
    id: JobId,
    total_ms: i64,
    mut rx: mpsc::Receiver<FfmpegProgress>,
) {
    while let Some(marker) = rx.recv().await {
        let pct = marker.percentage(total_ms);
        let message = format!("Converting: {pct:.1}%");

        if let Err(e) = store.write_progress(&id, pct, &message).await {
            warn!(job_id = %id, "Failed to persist progress: {e}");
        }
        if let Err(e) = progress
            .status(&id, JobStatus::Processing, pct, Some(message))
            .await
        {
            warn!(job_id = %id, "Failed to publish progress: {e}");
        }
    }
}

async fn publish_record(ctx: &WorkerContext, record: &JobRecord) {
    if let Err(e) = ctx.progress.publish(&StatusUpdate::from_record(record)).await {
        warn!(job_id = %record.id, "Failed to publish status update: {e}");
    }
}
