//! PostgreSQL store.

use super::{ApplyOutcome, StoreError, StoreResult, SyncStore};
use crate::db::{self, Pool};
use async_trait::async_trait;
use scoresync_engine::{
    decide, ChangeLogEntry, ChangeRecord, ConflictPolicy, Decision, Record, SnapshotItem,
    Timestamp,
};

/// [`SyncStore`] backed by the `sync_records` and `sync_changes` tables.
#[derive(Debug, Clone)]
pub struct PgSyncStore {
    pool: Pool,
}

impl PgSyncStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncStore for PgSyncStore {
    async fn apply(
        &self,
        change: &ChangeRecord,
        policy: ConflictPolicy,
    ) -> StoreResult<ApplyOutcome> {
        let mut tx = self.pool.begin().await?;

        // Held until commit/rollback, so concurrent pushes of one id apply in turn
        db::lock_record(&mut *tx, &change.id).await?;

        let existing = db::get_record(&mut *tx, &change.id)
            .await?
            .map(|stored| stored.to_record());

        let decision = decide(existing.as_ref(), change, policy)
            .map_err(|e| StoreError::Rejected(e.to_string()))?;

        match decision {
            Decision::Write { record, entry } => {
                db::upsert_record(&mut *tx, &record).await?;
                db::insert_change(&mut *tx, &entry, Some(&change.client_id), Some(change.version))
                    .await?;
                tx.commit().await?;
                Ok(ApplyOutcome::Applied(entry))
            }
            Decision::Skip(reason) => {
                tx.rollback().await?;
                Ok(ApplyOutcome::Skipped(reason))
            }
        }
    }

    async fn append(&self, entries: &[ChangeLogEntry]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            db::insert_change(&mut *tx, entry, None, None).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, since: Timestamp, limit: usize) -> StoreResult<Vec<ChangeLogEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = db::get_changes_since(&self.pool, since, limit).await?;

        rows.iter()
            .map(|row| row.to_entry().map_err(StoreError::Corrupt))
            .collect()
    }

    async fn checkpoint(&self) -> StoreResult<Option<Timestamp>> {
        Ok(db::get_checkpoint(&self.pool).await?)
    }

    async fn snapshot(&self) -> StoreResult<Vec<SnapshotItem>> {
        Ok(db::get_active_snapshot(&self.pool).await?)
    }

    async fn record(&self, id: &str) -> StoreResult<Option<Record>> {
        Ok(db::get_record(&self.pool, id)
            .await?
            .map(|stored| stored.to_record()))
    }
}
