//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long a blocking dequeue waits before the sweep gets a turn
    pub poll_timeout: Duration,
    /// Delay before retrying after a transient infrastructure error
    pub error_backoff: Duration,
    /// Hard ceiling on a single conversion
    pub conversion_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(5),
            conversion_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_timeout: Duration::from_secs(
                std::env::var("WORKER_POLL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            error_backoff: Duration::from_secs(
                std::env::var("WORKER_ERROR_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            conversion_timeout: Duration::from_secs(
                std::env::var("CONVERSION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}
