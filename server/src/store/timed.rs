//! Timeout wrapper for store backends.

use super::{ApplyOutcome, StoreError, StoreResult, SyncStore};
use async_trait::async_trait;
use scoresync_engine::{
    ChangeLogEntry, ChangeRecord, ConflictPolicy, Record, SnapshotItem, Timestamp,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Bounds every call on the inner store; an expired call fails with
/// [`StoreError::Busy`].
#[derive(Clone)]
pub struct TimedStore {
    inner: Arc<dyn SyncStore>,
    limit: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn SyncStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StoreResult<T>> + Send,
    ) -> StoreResult<T> {
        match timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation,
                    timeout_ms = self.limit.as_millis() as u64,
                    "store call timed out"
                );
                Err(StoreError::Busy { operation })
            }
        }
    }
}

#[async_trait]
impl SyncStore for TimedStore {
    async fn apply(
        &self,
        change: &ChangeRecord,
        policy: ConflictPolicy,
    ) -> StoreResult<ApplyOutcome> {
        self.bounded("apply", self.inner.apply(change, policy)).await
    }

    async fn append(&self, entries: &[ChangeLogEntry]) -> StoreResult<()> {
        self.bounded("append", self.inner.append(entries)).await
    }

    async fn query(&self, since: Timestamp, limit: usize) -> StoreResult<Vec<ChangeLogEntry>> {
        self.bounded("query", self.inner.query(since, limit)).await
    }

    async fn checkpoint(&self) -> StoreResult<Option<Timestamp>> {
        self.bounded("checkpoint", self.inner.checkpoint()).await
    }

    async fn snapshot(&self) -> StoreResult<Vec<SnapshotItem>> {
        self.bounded("snapshot", self.inner.snapshot()).await
    }

    async fn record(&self, id: &str) -> StoreResult<Option<Record>> {
        self.bounded("record", self.inner.record(id)).await
    }
}
