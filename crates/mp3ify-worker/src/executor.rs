//! The consumer loop.

use tokio::sync::watch;
use tracing::{error, info, warn};

use mp3ify_queue::ConversionQueue;

use crate::error::WorkerResult;
use crate::processor::{process_job, WorkerContext};
use crate::sweep::sweep_expired;

/// Long-lived conversion worker: one dequeue-and-convert loop interleaved
/// with the expiry sweep.
///
/// Conversions are strictly serial within a worker; scaling out means one
/// loop per process, with the queue's atomic pop providing mutual
/// exclusion.
pub struct Worker {
    ctx: WorkerContext,
    queue: ConversionQueue,
}

impl Worker {
    /// Create a new worker.
    pub fn new(ctx: WorkerContext, queue: ConversionQueue) -> Self {
        Self { ctx, queue }
    }

    /// Run until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> WorkerResult<()> {
        info!("Starting conversion worker");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown signal received, stopping worker");
                        return Ok(());
                    }
                }
                result = self.tick() => {
                    if let Err(e) = result {
                        error!("Worker cycle failed: {e}");
                        tokio::time::sleep(self.ctx.config.error_backoff).await;
                    }
                }
            }
        }
    }

    /// One cycle: sweep expired artifacts, then wait (bounded) for work.
    /// The bounded pop timeout keeps queue inactivity from starving the
    /// sweep.
    async fn tick(&self) -> WorkerResult<()> {
        if let Err(e) = sweep_expired(&self.ctx.expiry).await {
            warn!("Expiry sweep failed: {e}");
        }

        let Some(id) = self.queue.pop(self.ctx.config.poll_timeout).await? else {
            return Ok(());
        };

        process_job(&self.ctx, &id).await
    }
}
