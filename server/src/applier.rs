//! Change applier - validates client changes and writes them to the store.

use crate::store::{ApplyOutcome, StoreError, SyncStore};
use scoresync_engine::{
    ChangeLogEntry, ChangeRecord, ConflictPolicy, PushedItem, SkipReason, Timestamp,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Failure to apply a single change.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The change is malformed; nothing was written
    #[error(transparent)]
    Validation(#[from] scoresync_engine::Error),

    /// The store refused this change; the detail is logged, never returned
    #[error("write rejected")]
    Rejected(String),

    /// The store itself failed; the batch cannot continue
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApplyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(msg) => ApplyError::Rejected(msg),
            other => ApplyError::Store(other),
        }
    }
}

/// A valid change that left the store untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedChange {
    pub index: usize,
    pub id: String,
    pub reason: SkipReason,
}

/// A change that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedChange {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub error: String,
}

/// Per-item results of applying a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Log entries written, in batch order
    pub applied: Vec<ChangeLogEntry>,
    pub skipped: Vec<SkippedChange>,
    pub failed: Vec<FailedChange>,
    /// The applied changes, as held by the recently-pushed buffer
    pub pushed: Vec<PushedItem>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies validated changes to the authoritative store.
#[derive(Clone)]
pub struct ChangeApplier {
    store: Arc<dyn SyncStore>,
    policy: ConflictPolicy,
}

impl ChangeApplier {
    pub fn new(store: Arc<dyn SyncStore>, policy: ConflictPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Apply one change, producing its log entry when it is written.
    pub async fn apply(&self, change: &ChangeRecord) -> Result<ApplyOutcome, ApplyError> {
        change.validate()?;
        Ok(self.store.apply(change, self.policy).await?)
    }

    /// Apply a batch of raw JSON changes.
    ///
    /// Malformed or rejected items are reported and skipped; an unavailable
    /// store aborts the batch. Items are applied in order, so a later change
    /// to the same id sees the earlier one.
    pub async fn apply_batch(
        &self,
        changes: &[Value],
        now: Timestamp,
    ) -> Result<BatchReport, StoreError> {
        let mut report = BatchReport::default();

        for (index, raw) in changes.iter().enumerate() {
            let change = match ChangeRecord::from_value(raw, now) {
                Ok(change) => change,
                Err(e) => {
                    let id = raw_id(raw);
                    tracing::warn!(index, id = ?id, error = %e, "rejected malformed change");
                    report.failed.push(FailedChange {
                        index,
                        id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match self.apply(&change).await {
                Ok(ApplyOutcome::Applied(entry)) => {
                    report.pushed.push(PushedItem::from_change(&change));
                    report.applied.push(entry);
                }
                Ok(ApplyOutcome::Skipped(reason)) => {
                    tracing::debug!(index, id = %change.id, %reason, "change skipped");
                    report.skipped.push(SkippedChange {
                        index,
                        id: change.id,
                        reason,
                    });
                }
                Err(ApplyError::Store(e)) => return Err(e),
                Err(e) => {
                    if let ApplyError::Rejected(detail) = &e {
                        tracing::warn!(index, id = %change.id, %detail, "change rejected by store");
                    } else {
                        tracing::warn!(index, id = %change.id, error = %e, "change not applied");
                    }
                    report.failed.push(FailedChange {
                        index,
                        id: Some(change.id),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Best-effort id of a malformed change, for reporting.
fn raw_id(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySyncStore, StoreResult};
    use scoresync_engine::{ChangeType, Record, SnapshotItem};
    use serde_json::json;

    fn applier(policy: ConflictPolicy) -> (ChangeApplier, Arc<MemorySyncStore>) {
        let store = Arc::new(MemorySyncStore::new());
        (ChangeApplier::new(store.clone(), policy), store)
    }

    #[tokio::test]
    async fn apply_rejects_empty_id() {
        let (applier, store) = applier(ConflictPolicy::LastWriteWins);
        let change = ChangeRecord::upsert("", json!({}), 1, "c1", 1);

        let err = applier.apply(&change).await.unwrap_err();
        assert!(matches!(
            err,
            ApplyError::Validation(scoresync_engine::Error::EmptyRecordId)
        ));
        assert_eq!(store.log_len(), 0);
    }

    #[tokio::test]
    async fn batch_reports_partial_failure() {
        let (applier, store) = applier(ConflictPolicy::LastWriteWins);
        let changes = vec![
            json!({"id": "S1", "doc": {"name": "Alice"}, "timestamp": 10}),
            json!({"id": "", "doc": {}}),
            json!("not an object"),
            json!({"id": "S2", "type": "delete", "timestamp": 11}),
            json!({"id": 7, "type": "rename"}),
        ];

        let report = applier.apply_batch(&changes, 99).await.unwrap();

        assert_eq!(
            report.applied,
            vec![
                ChangeLogEntry::new(10, "S1", ChangeType::Upsert, None),
                ChangeLogEntry::new(11, "S2", ChangeType::Delete, None),
            ]
        );
        let failed: Vec<_> = report
            .failed
            .iter()
            .map(|f| (f.index, f.id.as_deref()))
            .collect();
        assert_eq!(failed, vec![(1, None), (2, None), (4, Some("7"))]);
        assert!(!report.is_clean());
        assert_eq!(store.log_len(), 2);
    }

    #[tokio::test]
    async fn batch_skips_stale_and_duplicate() {
        let (applier, _) = applier(ConflictPolicy::LastWriteWins);
        let changes = vec![
            json!({"id": "S1", "doc": {"v": 2}, "timestamp": 200}),
            json!({"id": "S1", "doc": {"v": 1}, "timestamp": 100}),
            json!({"id": "S1", "doc": {"v": 2}, "timestamp": 200}),
        ];

        let report = applier.apply_batch(&changes, 0).await.unwrap();

        assert_eq!(report.applied.len(), 1);
        assert_eq!(
            report.skipped,
            vec![
                SkippedChange {
                    index: 1,
                    id: "S1".into(),
                    reason: SkipReason::Superseded
                },
                SkippedChange {
                    index: 2,
                    id: "S1".into(),
                    reason: SkipReason::Duplicate
                },
            ]
        );
        assert!(report.is_clean());
        assert_eq!(report.pushed.len(), 1);
    }

    #[tokio::test]
    async fn missing_timestamp_uses_server_time() {
        let (applier, store) = applier(ConflictPolicy::LastWriteWins);
        let report = applier
            .apply_batch(&[json!({"id": "S1", "doc": {}})], 5555)
            .await
            .unwrap();

        assert_eq!(report.applied[0].ts, 5555);
        assert_eq!(
            store.record("S1").await.unwrap().unwrap().client_id,
            "client"
        );
    }

    /// Passes reads through and answers every apply with a fixed error.
    struct RefusingStore {
        inner: MemorySyncStore,
        refusal: fn() -> StoreError,
    }

    #[async_trait::async_trait]
    impl SyncStore for RefusingStore {
        async fn apply(&self, _: &ChangeRecord, _: ConflictPolicy) -> StoreResult<ApplyOutcome> {
            Err((self.refusal)())
        }
        async fn append(&self, entries: &[ChangeLogEntry]) -> StoreResult<()> {
            self.inner.append(entries).await
        }
        async fn query(&self, since: Timestamp, limit: usize) -> StoreResult<Vec<ChangeLogEntry>> {
            self.inner.query(since, limit).await
        }
        async fn checkpoint(&self) -> StoreResult<Option<Timestamp>> {
            self.inner.checkpoint().await
        }
        async fn snapshot(&self) -> StoreResult<Vec<SnapshotItem>> {
            self.inner.snapshot().await
        }
        async fn record(&self, id: &str) -> StoreResult<Option<Record>> {
            self.inner.record(id).await
        }
    }

    fn refusing(refusal: fn() -> StoreError) -> ChangeApplier {
        let store = RefusingStore {
            inner: MemorySyncStore::new(),
            refusal,
        };
        ChangeApplier::new(Arc::new(store), ConflictPolicy::LastWriteWins)
    }

    #[tokio::test]
    async fn rejected_write_hides_store_detail() {
        let applier = refusing(|| {
            StoreError::Rejected("value too long for type character varying(64)".into())
        });

        let report = applier
            .apply_batch(&[json!({"id": "S1", "doc": {}, "timestamp": 1})], 0)
            .await
            .unwrap();

        assert_eq!(
            report.failed,
            vec![FailedChange {
                index: 0,
                id: Some("S1".into()),
                error: "write rejected".into(),
            }]
        );
    }

    #[tokio::test]
    async fn unavailable_store_aborts_batch() {
        let applier = refusing(|| {
            StoreError::from_sqlstate(Some("42P01"), "relation \"sync_records\" does not exist")
        });

        let err = applier
            .apply_batch(&[json!({"id": "S1", "doc": {}, "timestamp": 1})], 0)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn store_errors_split_by_scope() {
        assert!(matches!(
            ApplyError::from(StoreError::Rejected("value too long".into())),
            ApplyError::Rejected(_)
        ));
        assert!(matches!(
            ApplyError::from(StoreError::Unavailable("connection refused".into())),
            ApplyError::Store(_)
        ));
    }
}
