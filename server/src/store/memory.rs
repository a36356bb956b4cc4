//! In-memory store.
//!
//! Records live in a [`DashMap`] so applies to different ids proceed in
//! parallel; the entry guard for an id is held while its log entry is
//! appended, which makes apply atomic per id. Nothing survives a restart.

use super::{ApplyOutcome, StoreError, StoreResult, SyncStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use scoresync_engine::{
    decide, ChangeLogEntry, ChangeRecord, ConflictPolicy, Decision, Record, SnapshotItem,
    Timestamp,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// A log entry with its arrival sequence.
#[derive(Debug, Clone)]
struct LoggedEntry {
    seq: u64,
    entry: ChangeLogEntry,
}

#[derive(Debug, Default)]
struct ChangeLog {
    entries: Vec<LoggedEntry>,
    next_seq: u64,
}

impl ChangeLog {
    fn push(&mut self, entry: ChangeLogEntry) {
        self.next_seq += 1;
        self.entries.push(LoggedEntry {
            seq: self.next_seq,
            entry,
        });
    }
}

/// Process-local [`SyncStore`].
#[derive(Debug, Default)]
pub struct MemorySyncStore {
    records: DashMap<String, Record>,
    log: Mutex<ChangeLog>,
}

impl MemorySyncStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut ChangeLog) -> T) -> StoreResult<T> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| StoreError::Unavailable("change log lock poisoned".to_string()))?;
        Ok(f(&mut *log))
    }

    /// Number of entries in the log, duplicates included.
    pub fn log_len(&self) -> usize {
        self.with_log(|log| log.entries.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SyncStore for MemorySyncStore {
    async fn apply(
        &self,
        change: &ChangeRecord,
        policy: ConflictPolicy,
    ) -> StoreResult<ApplyOutcome> {
        let slot = self.records.entry(change.id.clone());
        let existing = match &slot {
            Entry::Occupied(occupied) => Some(occupied.get()),
            Entry::Vacant(_) => None,
        };

        match decide(existing, change, policy)
            .map_err(|e| StoreError::Rejected(e.to_string()))?
        {
            Decision::Write { record, entry } => {
                self.with_log(|log| log.push(entry.clone()))?;
                slot.insert(record);
                Ok(ApplyOutcome::Applied(entry))
            }
            Decision::Skip(reason) => Ok(ApplyOutcome::Skipped(reason)),
        }
    }

    async fn append(&self, entries: &[ChangeLogEntry]) -> StoreResult<()> {
        self.with_log(|log| {
            for entry in entries {
                log.push(entry.clone());
            }
        })
    }

    async fn query(&self, since: Timestamp, limit: usize) -> StoreResult<Vec<ChangeLogEntry>> {
        self.with_log(|log| {
            let mut latest: HashMap<&str, &LoggedEntry> = HashMap::new();
            for logged in log.entries.iter().filter(|l| l.entry.ts > since) {
                latest
                    .entry(logged.entry.id.as_str())
                    .and_modify(|best| {
                        if (logged.entry.ts, logged.seq) > (best.entry.ts, best.seq) {
                            *best = logged;
                        }
                    })
                    .or_insert(logged);
            }

            let mut page: Vec<&LoggedEntry> = latest.into_values().collect();
            page.sort_by(|a, b| (b.entry.ts, b.seq).cmp(&(a.entry.ts, a.seq)));
            page.into_iter()
                .take(limit)
                .map(|l| l.entry.clone())
                .collect()
        })
    }

    async fn checkpoint(&self) -> StoreResult<Option<Timestamp>> {
        self.with_log(|log| scoresync_engine::checkpoint(log.entries.iter().map(|l| &l.entry)))
    }

    async fn snapshot(&self) -> StoreResult<Vec<SnapshotItem>> {
        let mut items: Vec<SnapshotItem> = self
            .records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| SnapshotItem::new(r.id.clone(), r.url.clone()))
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn record(&self, id: &str) -> StoreResult<Option<Record>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }
}
