//! Conflict decisions for incoming changes.
//!
//! [`decide`] is the pure half of applying a change: given the stored record
//! (if any) it says whether the change should be written, and if so what the
//! new record state and log entry are. Persisting the decision atomically is
//! the caller's job.

use crate::{error::Result, ChangeLogEntry, ChangeRecord, Error, Record, Stamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an incoming change is weighed against the stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Write only if the incoming [`Stamp`] is strictly greater than the stored one
    #[default]
    LastWriteWins,
    /// Always write; only exact replays are dropped
    Overwrite,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::LastWriteWins => f.write_str("last-write-wins"),
            ConflictPolicy::Overwrite => f.write_str("overwrite"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(ConflictPolicy::LastWriteWins),
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            other => Err(Error::UnknownConflictPolicy(other.to_string())),
        }
    }
}

/// Why a valid change was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The exact same change was already applied
    Duplicate,
    /// The stored record is newer
    Superseded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Duplicate => f.write_str("duplicate"),
            SkipReason::Superseded => f.write_str("superseded"),
        }
    }
}

/// Outcome of weighing a change against the stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Persist `record` and append `entry`
    Write {
        record: Record,
        entry: ChangeLogEntry,
    },
    /// Leave the store untouched
    Skip(SkipReason),
}

/// Decide what applying `change` on top of `existing` does.
///
/// Fails only when the change itself is invalid.
pub fn decide(
    existing: Option<&Record>,
    change: &ChangeRecord,
    policy: ConflictPolicy,
) -> Result<Decision> {
    change.validate()?;

    let record = match existing {
        None => Record::from_change(change),
        Some(stored) => {
            let incoming = Stamp::of(change);
            let current = stored.stamp();

            if incoming == current {
                return Ok(Decision::Skip(SkipReason::Duplicate));
            }
            if policy == ConflictPolicy::LastWriteWins && incoming < current {
                return Ok(Decision::Skip(SkipReason::Superseded));
            }

            let mut record = stored.clone();
            record.apply_change(change);
            record
        }
    };

    Ok(Decision::Write {
        record,
        entry: ChangeLogEntry::for_change(change),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeType;
    use serde_json::json;

    fn stored(ts: i64) -> Record {
        Record::from_change(&ChangeRecord::upsert(
            "S1",
            json!({"name": "Stored"}),
            1,
            "c1",
            ts,
        ))
    }

    #[test]
    fn new_record_is_written() {
        let change = ChangeRecord::upsert("S1", json!({"name": "Alice"}), 1, "c1", 1000);

        match decide(None, &change, ConflictPolicy::LastWriteWins).unwrap() {
            Decision::Write { record, entry } => {
                assert_eq!(record.doc, json!({"name": "Alice"}));
                assert_eq!(entry, ChangeLogEntry::new(1000, "S1", ChangeType::Upsert, None));
            }
            other => panic!("expected write, got {other:?}"),
        }
    }

    #[test]
    fn replay_is_duplicate_under_both_policies() {
        let change = ChangeRecord::upsert("S1", json!({"name": "Stored"}), 1, "c1", 1000);
        let existing = Record::from_change(&change);

        for policy in [ConflictPolicy::LastWriteWins, ConflictPolicy::Overwrite] {
            assert_eq!(
                decide(Some(&existing), &change, policy).unwrap(),
                Decision::Skip(SkipReason::Duplicate)
            );
        }
    }

    #[test]
    fn older_change_is_superseded_under_lww() {
        let existing = stored(2000);
        let change = ChangeRecord::upsert("S1", json!({"name": "Old"}), 1, "c2", 1000);

        assert_eq!(
            decide(Some(&existing), &change, ConflictPolicy::LastWriteWins).unwrap(),
            Decision::Skip(SkipReason::Superseded)
        );
    }

    #[test]
    fn older_change_overwrites_under_overwrite_policy() {
        let existing = stored(2000);
        let change = ChangeRecord::upsert("S1", json!({"name": "Old"}), 1, "c2", 1000);

        match decide(Some(&existing), &change, ConflictPolicy::Overwrite).unwrap() {
            Decision::Write { record, .. } => {
                assert_eq!(record.doc, json!({"name": "Old"}));
                assert_eq!(record.timestamp, 1000);
            }
            other => panic!("expected write, got {other:?}"),
        }
    }

    #[test]
    fn newer_delete_tombstones() {
        let existing = stored(1000);
        let change = ChangeRecord::delete("S1", 2, "c1", 1500);

        match decide(Some(&existing), &change, ConflictPolicy::LastWriteWins).unwrap() {
            Decision::Write { record, entry } => {
                assert!(record.deleted);
                assert_eq!(entry.change_type, ChangeType::Delete);
                assert_eq!(entry.ts, 1500);
            }
            other => panic!("expected write, got {other:?}"),
        }
    }

    #[test]
    fn equal_timestamp_breaks_tie_on_client() {
        let existing = stored(1000);
        let change = ChangeRecord::upsert("S1", json!({"name": "Z"}), 1, "c9", 1000);

        assert!(matches!(
            decide(Some(&existing), &change, ConflictPolicy::LastWriteWins).unwrap(),
            Decision::Write { .. }
        ));
    }

    #[test]
    fn invalid_change_is_rejected() {
        let change = ChangeRecord::upsert("", json!({}), 1, "c1", 1000);
        assert_eq!(
            decide(None, &change, ConflictPolicy::LastWriteWins),
            Err(Error::EmptyRecordId)
        );
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(
            "last-write-wins".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::LastWriteWins
        );
        assert_eq!(
            " Overwrite ".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::Overwrite
        );
        assert_eq!(
            "newest".parse::<ConflictPolicy>(),
            Err(Error::UnknownConflictPolicy("newest".into()))
        );
        assert_eq!(ConflictPolicy::default().to_string(), "last-write-wins");
    }
}
