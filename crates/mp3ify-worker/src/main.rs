//! Conversion worker binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mp3ify_queue::{ConversionQueue, ExpiryIndex, JobStore, ProgressChannel, QueueResult};
use mp3ify_worker::{Worker, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("mp3ify_worker=info".parse().unwrap())
        .add_directive("mp3ify_queue=info".parse().unwrap())
        .add_directive("mp3ify_media=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting mp3ify-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // FFmpeg is required before any job can run
    if let Err(e) = mp3ify_media::check_ffmpeg() {
        error!("FFmpeg check failed: {e}");
        std::process::exit(1);
    }
    if let Err(e) = mp3ify_media::check_ffprobe() {
        error!("FFprobe check failed: {e}");
        std::process::exit(1);
    }

    let (ctx, queue) = match build_worker(config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to create Redis clients: {e}");
            std::process::exit(1);
        }
    };

    let worker = Worker::new(ctx, queue);

    // Setup signal handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = worker.run(shutdown_rx).await {
        error!("Worker error: {e}");
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

fn build_worker(config: WorkerConfig) -> QueueResult<(WorkerContext, ConversionQueue)> {
    let ctx = WorkerContext {
        config,
        store: Arc::new(JobStore::from_env()?),
        expiry: Arc::new(ExpiryIndex::from_env()?),
        progress: Arc::new(ProgressChannel::from_env()?),
    };
    Ok((ctx, ConversionQueue::from_env()?))
}
