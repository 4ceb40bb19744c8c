//! End-to-end worker scenarios.
//!
//! These run against a local Redis and a real FFmpeg, exercising the full
//! submit -> convert -> sweep pipeline. Run with `cargo test -- --ignored`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use mp3ify_models::{JobId, JobRecord, JobStatus};
use mp3ify_queue::{
    ConversionQueue, ExpiryIndex, JobProducer, JobStore, ProducerConfig, ProgressChannel,
};
use mp3ify_worker::{process_job, sweep_expired, WorkerConfig, WorkerContext};

fn redis_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Write a silent PCM WAV of the given duration, so tests do not depend on
/// any checked-in media fixture.
fn write_test_wav(path: &Path, secs: u32) {
    const SAMPLE_RATE: u32 = 8000;
    let data_len = SAMPLE_RATE * 2 * secs; // 16-bit mono

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);

    std::fs::write(path, bytes).unwrap();
}

struct Harness {
    ctx: WorkerContext,
    producer: JobProducer,
    queue: ConversionQueue,
    store: JobStore,
    expiry: ExpiryIndex,
    _dir: TempDir,
}

fn harness() -> Harness {
    let url = redis_url();
    let dir = TempDir::new().unwrap();

    let queue_key = format!("mp3ify:test_queue:{}", JobId::new());
    let expiry_key = format!("mp3ify:test_expiry:{}", JobId::new());

    let store = JobStore::new(&url).unwrap();
    let queue = ConversionQueue::with_key(&url, queue_key).unwrap();
    let expiry = ExpiryIndex::with_key(&url, expiry_key).unwrap();
    let progress = ProgressChannel::new(&url).unwrap();

    let producer = JobProducer::new(
        store.clone(),
        queue.clone(),
        expiry.clone(),
        ProducerConfig {
            output_dir: dir.path().to_path_buf(),
            retention: Duration::from_secs(24 * 3600),
        },
    );

    let ctx = WorkerContext {
        config: WorkerConfig::default(),
        store: Arc::new(store.clone()),
        expiry: Arc::new(expiry.clone()),
        progress: Arc::new(progress),
    };

    Harness {
        ctx,
        producer,
        queue,
        store,
        expiry,
        _dir: dir,
    }
}

/// A valid input converts to completion with progress at exactly 100 and
/// the input artifact reclaimed.
#[tokio::test]
#[ignore = "requires Redis and FFmpeg"]
async fn test_conversion_completes_with_full_progress() {
    let h = harness();

    let input = h._dir.path().join("input.wav");
    write_test_wav(&input, 10);

    let record = h.producer.submit("talk.wav", &input).await.unwrap();
    let id = h.queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(id, record.id);

    process_job(&h.ctx, &id).await.unwrap();

    let finished = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.progress, 100.0);
    assert_eq!(finished.message.as_deref(), Some("Conversion completed"));

    let output_meta = std::fs::metadata(&finished.output_path).unwrap();
    assert!(output_meta.len() > 0);
    assert!(!input.exists(), "Input artifact should be reclaimed");

    h.store.delete(&id).await.unwrap();
}

/// An unreadable input fails the job, preserves the input artifact and
/// produces no output.
#[tokio::test]
#[ignore = "requires Redis and FFmpeg"]
async fn test_failed_conversion_preserves_input() {
    let h = harness();

    let input = h._dir.path().join("garbage.mp4");
    std::fs::write(&input, b"this is not a media file").unwrap();

    let record = h.producer.submit("garbage.mp4", &input).await.unwrap();
    let id = h.queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();

    process_job(&h.ctx, &id).await.unwrap();

    let finished = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(finished.status, JobStatus::Failed);
    assert!(finished
        .message
        .as_deref()
        .unwrap_or_default()
        .starts_with("Conversion failed"));

    assert!(input.exists(), "Failed input must be kept for inspection");
    assert!(!Path::new(&finished.output_path).exists());

    h.store.delete(&id).await.unwrap();
}

/// A dequeued entry whose record is no longer `queued` is consumed without
/// touching the record.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_non_queued_entry_is_skipped() {
    let h = harness();

    let input = h._dir.path().join("input.wav");
    write_test_wav(&input, 1);

    let record = h.producer.submit("talk.wav", &input).await.unwrap();

    // Simulate a duplicate delivery arriving after processing started.
    let mut started = h.store.get(&record.id).await.unwrap().unwrap();
    started.start().unwrap();
    h.store.write_transition(&started).await.unwrap();

    let id = h.queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
    process_job(&h.ctx, &id).await.unwrap();

    let after = h.store.get(&record.id).await.unwrap().unwrap();
    assert_eq!(after.status, JobStatus::Processing);
    assert_eq!(after.progress, 0.0);

    // The entry was consumed exactly once.
    assert!(h.queue.pop(Duration::from_secs(1)).await.unwrap().is_none());

    h.store.delete(&record.id).await.unwrap();
}

/// A dequeued entry with no record at all is skipped.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_missing_record_is_skipped() {
    let h = harness();

    let phantom = JobId::new();
    h.queue.push(&phantom).await.unwrap();

    let id = h.queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
    process_job(&h.ctx, &id).await.unwrap();

    assert!(h.store.get(&phantom).await.unwrap().is_none());
}

/// The sweep deletes artifacts past their deadline, tolerates missing
/// files and leaves future entries alone.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_sweep_removes_due_artifacts_only() {
    let h = harness();

    let stale = h._dir.path().join("stale.mp3");
    let fresh = h._dir.path().join("fresh.mp3");
    std::fs::write(&stale, b"old").unwrap();
    std::fs::write(&fresh, b"new").unwrap();

    let gone = h._dir.path().join("already-gone.mp3");

    h.expiry
        .schedule(&stale.to_string_lossy(), Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    h.expiry
        .schedule(&gone.to_string_lossy(), Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    h.expiry
        .schedule(&fresh.to_string_lossy(), Utc::now() + chrono::Duration::hours(1))
        .await
        .unwrap();

    let removed = sweep_expired(&h.expiry).await.unwrap();
    assert_eq!(removed, 1);

    assert!(!stale.exists());
    assert!(fresh.exists());

    // Both due entries are gone from the index, the future one remains.
    let later = Utc::now() + chrono::Duration::hours(2);
    let remaining = h.expiry.due(later).await.unwrap();
    assert_eq!(remaining, vec![fresh.to_string_lossy().to_string()]);

    h.expiry.retract(&fresh.to_string_lossy()).await.unwrap();
}

/// Retracting an entry keeps the sweep away from the artifact.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_retracted_entry_is_never_swept() {
    let h = harness();

    let artifact = h._dir.path().join("downloaded.mp3");
    std::fs::write(&artifact, b"audio").unwrap();

    h.expiry
        .schedule(&artifact.to_string_lossy(), Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    h.expiry.retract(&artifact.to_string_lossy()).await.unwrap();

    sweep_expired(&h.expiry).await.unwrap();
    assert!(artifact.exists());
}

/// Two jobs through a single worker are processed strictly in order.
#[tokio::test]
#[ignore = "requires Redis and FFmpeg"]
async fn test_back_to_back_jobs_are_serialized() {
    let h = harness();

    let first_input = h._dir.path().join("first.wav");
    let second_input = h._dir.path().join("second.wav");
    write_test_wav(&first_input, 2);
    write_test_wav(&second_input, 2);

    let first = h.producer.submit("first.wav", &first_input).await.unwrap();
    let second = h.producer.submit("second.wav", &second_input).await.unwrap();

    let popped = h.queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(popped, first.id);
    process_job(&h.ctx, &popped).await.unwrap();
    let first_done_at = Utc::now();

    let popped = h.queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(popped, second.id);
    let second_started_at = Utc::now();
    process_job(&h.ctx, &popped).await.unwrap();

    assert!(second_started_at >= first_done_at);
    assert_eq!(
        h.store.get(&first.id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );
    assert_eq!(
        h.store.get(&second.id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );

    h.store.delete(&first.id).await.unwrap();
    h.store.delete(&second.id).await.unwrap();
}

/// Querying an identifier that was never submitted is an explicit
/// "not found", distinct from every status value.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_unknown_job_is_not_found() {
    let h = harness();
    assert!(h.store.get(&JobId::new()).await.unwrap().is_none());
}

/// Progress published during a conversion stays within [0, 100] and ends
/// terminal.
#[tokio::test]
#[ignore = "requires Redis and FFmpeg"]
async fn test_progress_stream_is_bounded_and_terminal() {
    use futures_util::StreamExt;

    let h = harness();

    let input = h._dir.path().join("input.wav");
    write_test_wav(&input, 5);

    let record = h.producer.submit("talk.wav", &input).await.unwrap();
    let mut stream = h.ctx.progress.subscribe(&record.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let id = h.queue.pop(Duration::from_secs(1)).await.unwrap().unwrap();
    process_job(&h.ctx, &id).await.unwrap();

    let mut last = None;
    while let Ok(Some(update)) =
        tokio::time::timeout(Duration::from_secs(2), stream.next()).await
    {
        assert!((0.0..=100.0).contains(&update.progress));
        let terminal = update.status.is_terminal();
        last = Some(update);
        if terminal {
            break;
        }
    }

    let last = last.expect("At least one update expected");
    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!(last.progress, 100.0);

    h.store.delete(&record.id).await.unwrap();
}

/// Records survive the text round-trip through Redis unchanged.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_record_survives_storage_round_trip() {
    let h = harness();

    let mut record = JobRecord::new(
        JobId::new(),
        "weird name  with spaces.mp4",
        "/tmp/uploads/in.mp4",
        "/tmp/uploads/out.mp3",
    );
    record.start().unwrap();
    record.set_progress(66.7, Some("Converting: 66.7%".into()));

    h.store.put(&record).await.unwrap();
    let restored = h.store.get(&record.id).await.unwrap().unwrap();

    assert_eq!(restored.original_filename, record.original_filename);
    assert_eq!(restored.status, JobStatus::Processing);
    assert_eq!(restored.progress, 66.7);

    h.store.delete(&record.id).await.unwrap();
}
