//! Items returned to pulling clients and the sources they come from.

use crate::{ChangeLogEntry, ChangeRecord, ChangeType, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// A single entry in a pull response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItem {
    pub ts: Timestamp,
    pub id: RecordId,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<ChangeLogEntry> for SyncItem {
    fn from(entry: ChangeLogEntry) -> Self {
        Self {
            ts: entry.ts,
            id: entry.id,
            change_type: entry.change_type,
            url: entry.url,
        }
    }
}

/// An active record as seen by a client syncing for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SnapshotItem {
    pub fn new(id: impl Into<RecordId>, url: Option<String>) -> Self {
        Self { id: id.into(), url }
    }

    /// Snapshot items are stamped with the pull time.
    pub fn at(self, now: Timestamp) -> SyncItem {
        SyncItem {
            ts: now,
            id: self.id,
            change_type: ChangeType::Upsert,
            url: self.url,
        }
    }
}

/// A change from the most recent push, held in memory until the next push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedItem {
    pub id: RecordId,
    pub ts: Timestamp,
    pub url: Option<String>,
}

impl PushedItem {
    pub fn from_change(change: &ChangeRecord) -> Self {
        Self {
            id: change.id.clone(),
            ts: change.timestamp,
            url: change.url().map(str::to_string),
        }
    }

    /// Pushed items are always reported as upserts, whatever the change was.
    pub fn to_item(&self) -> SyncItem {
        SyncItem {
            ts: self.ts,
            id: self.id.clone(),
            change_type: ChangeType::Upsert,
            url: self.url.clone(),
        }
    }
}
