//! Change log and record storage.
//!
//! [`SyncStore`] is the seam between the sync handlers and persistence. Two
//! backends implement it: [`PgSyncStore`] for PostgreSQL and
//! [`MemorySyncStore`] for development and tests. [`TimedStore`] wraps either
//! one and bounds every call.

mod memory;
mod postgres;
mod timed;

pub use memory::MemorySyncStore;
pub use postgres::PgSyncStore;
pub use timed::TimedStore;

use async_trait::async_trait;
use scoresync_engine::{
    ChangeLogEntry, ChangeRecord, ConflictPolicy, Record, SkipReason, SnapshotItem, Timestamp,
};

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached; the whole request fails
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the configured timeout
    #[error("store call '{operation}' timed out")]
    Busy { operation: &'static str },

    /// The backend refused this particular write
    #[error("write rejected: {0}")]
    Rejected(String),

    /// A stored row could not be decoded
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Classify a database error by its SQLSTATE.
    ///
    /// Only data exceptions (class 22) and integrity constraint violations
    /// (class 23) are tied to the row being written. Every other class means
    /// the store itself is unusable.
    pub fn from_sqlstate(code: Option<&str>, message: &str) -> Self {
        match code {
            Some(code) if code.starts_with("22") || code.starts_with("23") => {
                StoreError::Rejected(message.to_string())
            }
            Some(code) => StoreError::Unavailable(format!("{message} (SQLSTATE {code})")),
            None => StoreError::Unavailable(message.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                StoreError::from_sqlstate(db_err.code().as_deref(), db_err.message())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What happened when a change reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The record was written and this entry appended to the log
    Applied(ChangeLogEntry),
    /// The store was left untouched
    Skipped(SkipReason),
}

/// Authoritative record store plus its append-only change log.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Weigh `change` against the stored record and, if it wins, write the
    /// record and append its log entry as one atomic step.
    async fn apply(
        &self,
        change: &ChangeRecord,
        policy: ConflictPolicy,
    ) -> StoreResult<ApplyOutcome>;

    /// Append raw entries to the log, preserving their order.
    async fn append(&self, entries: &[ChangeLogEntry]) -> StoreResult<()>;

    /// Latest entry per record with `ts > since`, newest first, at most `limit`.
    async fn query(&self, since: Timestamp, limit: usize) -> StoreResult<Vec<ChangeLogEntry>>;

    /// Highest timestamp in the log, `None` when the log is empty.
    async fn checkpoint(&self) -> StoreResult<Option<Timestamp>>;

    /// Every active record, for clients syncing for the first time.
    async fn snapshot(&self) -> StoreResult<Vec<SnapshotItem>>;

    /// Current state of one record, including tombstones.
    async fn record(&self, id: &str) -> StoreResult<Option<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_errors_are_rejected() {
        for code in ["23505", "23502", "22001", "22P02"] {
            assert!(matches!(
                StoreError::from_sqlstate(Some(code), "bad row"),
                StoreError::Rejected(_)
            ));
        }
    }

    #[test]
    fn store_wide_errors_are_unavailable() {
        for code in ["42P01", "57P01", "25006", "53100", "08006"] {
            assert!(matches!(
                StoreError::from_sqlstate(Some(code), "relation \"sync_records\" does not exist"),
                StoreError::Unavailable(_)
            ));
        }
        assert!(matches!(
            StoreError::from_sqlstate(None, "no code"),
            StoreError::Unavailable(_)
        ));
    }
}
