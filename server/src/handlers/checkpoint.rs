//! Checkpoint handler - reports the latest durable timestamp.

use crate::error::Result;
use crate::store::SyncStore;
use scoresync_engine::Timestamp;
use serde::Serialize;

/// Response for checkpoint requests.
#[derive(Debug, Serialize)]
pub struct CheckpointResponse {
    /// Highest timestamp in the change log, `null` when the log is empty
    pub checkpoint: Option<Timestamp>,
}

/// Read the current checkpoint.
pub async fn handle_checkpoint(store: &dyn SyncStore) -> Result<CheckpointResponse> {
    let checkpoint = store.checkpoint().await.inspect_err(|e| {
        tracing::warn!(error = %e, "sync_checkpoint failed");
    })?;

    tracing::debug!(?checkpoint, "sync_checkpoint");
    Ok(CheckpointResponse { checkpoint })
}
