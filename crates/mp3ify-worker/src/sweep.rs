//! Expiry sweep for stored artifacts.

use chrono::Utc;
use tracing::{debug, info, warn};

use mp3ify_queue::{ExpiryIndex, QueueResult};

/// Delete every artifact whose retention deadline has passed. Returns the
/// number of artifacts actually deleted.
///
/// Entries are independent: one failed deletion is logged and the pass
/// moves on. An already-missing artifact still has its entry removed.
pub async fn sweep_expired(expiry: &ExpiryIndex) -> QueueResult<usize> {
    let due = expiry.due(Utc::now()).await?;
    if due.is_empty() {
        return Ok(0);
    }

    let mut removed = 0;
    for path in due {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path, "Deleted expired artifact");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "Expired artifact already gone, dropping entry");
            }
            Err(e) => {
                // Keep the entry so the next pass can retry this artifact.
                warn!(path = %path, "Failed to delete expired artifact: {e}");
                continue;
            }
        }
        expiry.retract(&path).await?;
    }

    Ok(removed)
}
