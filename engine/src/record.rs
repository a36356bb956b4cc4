//! Authoritative record state.

use crate::{ChangeRecord, ChangeType, ClientId, RecordId, Timestamp, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordering key for last-write-wins.
///
/// Ordering rules:
/// 1. Higher timestamp wins
/// 2. If timestamps are equal, higher version wins
/// 3. If versions are equal, lexicographically higher client id wins
///
/// Two changes with equal stamps are the same change replayed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp {
    pub timestamp: Timestamp,
    pub version: Version,
    pub client_id: ClientId,
}

impl Stamp {
    pub fn of(change: &ChangeRecord) -> Self {
        Self {
            timestamp: change.timestamp,
            version: change.version,
            client_id: change.client_id.clone(),
        }
    }
}

/// The current state of one record in the authoritative store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier for this record
    pub id: RecordId,
    /// Latest document; kept as the last known value after a delete
    pub doc: Value,
    /// Version from the change that last wrote this record
    pub version: Version,
    /// Client that last wrote this record
    pub client_id: ClientId,
    /// Timestamp of the change that last wrote this record
    pub timestamp: Timestamp,
    /// Asset URL from the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Soft delete flag (tombstone)
    pub deleted: bool,
}

impl Record {
    /// Build the state a change produces on a record that does not exist yet.
    pub fn from_change(change: &ChangeRecord) -> Self {
        let mut record = Self {
            id: change.id.clone(),
            doc: Value::Object(Default::default()),
            version: change.version,
            client_id: change.client_id.clone(),
            timestamp: change.timestamp,
            url: None,
            deleted: false,
        };
        record.apply_change(change);
        record
    }

    /// Check if record is active (not deleted).
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    pub fn stamp(&self) -> Stamp {
        Stamp {
            timestamp: self.timestamp,
            version: self.version,
            client_id: self.client_id.clone(),
        }
    }

    /// Overwrite this record with `change`.
    pub fn apply_change(&mut self, change: &ChangeRecord) {
        match change.change_type {
            ChangeType::Upsert => {
                if let Some(doc) = &change.doc {
                    self.doc = doc.clone();
                }
                self.url = change.url().map(str::to_string);
                self.deleted = false;
            }
            ChangeType::Delete => {
                self.deleted = true;
            }
        }
        self.version = change.version;
        self.client_id = change.client_id.clone();
        self.timestamp = change.timestamp;
    }
}
