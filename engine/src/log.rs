//! Change log entries.

use crate::{ChangeRecord, ChangeType, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// A durable record that a change was applied.
///
/// Entries are append-only: created once when a change is applied, never
/// mutated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Timestamp accepted from the applied change
    pub ts: Timestamp,
    /// Record identity
    pub id: RecordId,
    /// Upsert or delete
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Asset URL of the record at the time of the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChangeLogEntry {
    pub fn new(
        ts: Timestamp,
        id: impl Into<RecordId>,
        change_type: ChangeType,
        url: Option<String>,
    ) -> Self {
        Self {
            ts,
            id: id.into(),
            change_type,
            url,
        }
    }

    /// The entry logged when `change` is applied.
    pub fn for_change(change: &ChangeRecord) -> Self {
        Self {
            ts: change.timestamp,
            id: change.id.clone(),
            change_type: change.change_type,
            url: change.url().map(str::to_string),
        }
    }
}

/// Latest timestamp across `entries`, `None` when there are none.
pub fn checkpoint<'a>(entries: impl IntoIterator<Item = &'a ChangeLogEntry>) -> Option<Timestamp> {
    entries.into_iter().map(|e| e.ts).max()
}
