//! Push handler - applies incoming change batches.

use crate::applier::{ChangeApplier, FailedChange, SkippedChange};
use crate::error::{AppError, Result, INVALID_CHANGES};
use crate::recent::RecentPushes;
use crate::store::SyncStore;
use scoresync_engine::{RecordId, Timestamp};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Response for push sync.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    /// True when no change failed
    pub ok: bool,
    /// Identifier for this batch, for correlating logs
    pub batch_id: Uuid,
    /// Ids of the changes that were written, in batch order
    pub applied: Vec<RecordId>,
    /// Valid changes that lost to the stored record
    pub skipped: Vec<SkippedChange>,
    /// Changes that could not be applied
    pub failed: Vec<FailedChange>,
    /// Checkpoint after the batch, `null` if it could not be read
    pub checkpoint: Option<Timestamp>,
}

/// Pull the `changes` array out of a push body.
pub fn extract_changes(body: &Value) -> Result<&[Value]> {
    body.get("changes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| AppError::BadRequest(INVALID_CHANGES.to_string()))
}

/// Process a push request from a client.
pub async fn handle_push(
    applier: &ChangeApplier,
    store: &dyn SyncStore,
    recent: &RecentPushes,
    body: Value,
    authenticated: bool,
    now: Timestamp,
) -> Result<PushResponse> {
    let changes = extract_changes(&body)?;
    let batch_id = Uuid::new_v4();

    let report = applier
        .apply_batch(changes, now)
        .await
        .inspect_err(|e| {
            tracing::error!(%batch_id, received = changes.len(), error = %e, "sync_push aborted");
        })?;

    let ok = report.is_clean();
    let applied: Vec<RecordId> = report.applied.iter().map(|e| e.id.clone()).collect();

    recent.replace(report.pushed).await;

    // The batch is committed at this point; a failed read only loses the checkpoint
    let checkpoint = match store.checkpoint().await {
        Ok(checkpoint) => checkpoint,
        Err(e) => {
            tracing::warn!(%batch_id, error = %e, "sync_push checkpoint unavailable");
            None
        }
    };

    tracing::info!(
        %batch_id,
        received = changes.len(),
        applied = applied.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        policy = %applier.policy(),
        authenticated,
        "sync_push"
    );

    Ok(PushResponse {
        ok,
        batch_id,
        applied,
        skipped: report.skipped,
        failed: report.failed,
        checkpoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySyncStore;
    use scoresync_engine::ConflictPolicy;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (ChangeApplier, Arc<MemorySyncStore>, RecentPushes) {
        let store = Arc::new(MemorySyncStore::new());
        let applier = ChangeApplier::new(store.clone(), ConflictPolicy::LastWriteWins);
        (applier, store, RecentPushes::new())
    }

    #[test]
    fn extract_changes_requires_array() {
        assert!(extract_changes(&json!({"changes": []})).is_ok());
        for body in [json!({}), json!({"changes": {}}), json!([]), json!("x")] {
            assert!(matches!(
                extract_changes(&body),
                Err(AppError::BadRequest(msg)) if msg == INVALID_CHANGES
            ));
        }
    }

    #[tokio::test]
    async fn push_applies_and_buffers() {
        let (applier, store, recent) = setup();
        let body = json!({"changes": [
            {"id": "S1", "doc": {"name": "Alice"}, "timestamp": 1000},
            {"id": "", "doc": {}},
        ]});

        let response = handle_push(&applier, store.as_ref(), &recent, body, false, 5)
            .await
            .unwrap();

        assert!(!response.ok);
        assert_eq!(response.applied, vec!["S1".to_string()]);
        assert_eq!(response.failed.len(), 1);
        assert_eq!(response.checkpoint, Some(1000));
        assert_eq!(recent.items().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_push_clears_buffer() {
        let (applier, store, recent) = setup();
        let first = json!({"changes": [{"id": "S1", "doc": {}, "timestamp": 10}]});
        handle_push(&applier, store.as_ref(), &recent, first, false, 0)
            .await
            .unwrap();

        let response = handle_push(&applier, store.as_ref(), &recent, json!({"changes": []}), false, 0)
            .await
            .unwrap();

        assert!(response.ok);
        assert!(response.applied.is_empty());
        assert_eq!(response.checkpoint, Some(10));
        assert!(recent.items().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_body_leaves_buffer() {
        let (applier, store, recent) = setup();
        let first = json!({"changes": [{"id": "S1", "doc": {}, "timestamp": 10}]});
        handle_push(&applier, store.as_ref(), &recent, first, false, 0)
            .await
            .unwrap();

        let err = handle_push(&applier, store.as_ref(), &recent, json!({"changes": 3}), false, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(recent.items().await.len(), 1);
    }
}
