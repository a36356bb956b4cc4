//! Pull merging.
//!
//! A pull combines three sources: the change log, a snapshot of active
//! records (first sync only) and the most recent push batch. The merge keeps
//! the freshest item per record id, newest first, up to the client's limit.

use crate::{ChangeLogEntry, PushedItem, SnapshotItem, SyncItem, Timestamp};
use std::collections::HashSet;

/// Default page size for a pull.
pub const DEFAULT_LIMIT: usize = 1000;

/// Smallest page a client may ask for.
pub const MIN_LIMIT: usize = 1;

/// Largest page a client may ask for.
pub const MAX_LIMIT: usize = 10_000;

/// Clamped `since` and `limit` for one pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullWindow {
    /// Only changes strictly after this timestamp
    pub since: Timestamp,
    /// Maximum number of items to return
    pub limit: usize,
    /// The client asked from the very beginning (`since` exactly 0 after clamping)
    pub first_sync: bool,
}

impl Default for PullWindow {
    fn default() -> Self {
        Self {
            since: 0,
            limit: DEFAULT_LIMIT,
            first_sync: true,
        }
    }
}

impl PullWindow {
    /// Clamp raw numeric inputs.
    ///
    /// Missing or non-finite values fall back to the defaults, negative
    /// `since` becomes 0, `limit` is clamped to [`MIN_LIMIT`]..=[`MAX_LIMIT`].
    /// Fractions are truncated; a fractional `since` between 0 and 1 still
    /// counts as a resumed sync, not a first one.
    pub fn new(since: Option<f64>, limit: Option<f64>) -> Self {
        let (since, first_sync) = match since {
            Some(s) if s.is_finite() && s > 0.0 => {
                (s.min(Timestamp::MAX as f64).trunc() as Timestamp, false)
            }
            _ => (0, true),
        };
        let limit = match limit {
            Some(l) if l.is_finite() => l.clamp(MIN_LIMIT as f64, MAX_LIMIT as f64) as usize,
            _ => DEFAULT_LIMIT,
        };
        Self {
            since,
            limit,
            first_sync,
        }
    }

    /// Parse query-string values; anything that is not a number is treated as missing.
    pub fn parse(since: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(since.and_then(parse_number), limit.and_then(parse_number))
    }

    /// First-time syncs get a snapshot of every active record.
    pub fn wants_snapshot(&self) -> bool {
        self.first_sync
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok()
}

/// Everything a pull draws from.
#[derive(Debug, Clone, Default)]
pub struct PullSources {
    pub changes: Vec<ChangeLogEntry>,
    pub snapshot: Vec<SyncItem>,
    pub pushed: Vec<SyncItem>,
}

impl PullSources {
    pub fn new(changes: Vec<ChangeLogEntry>) -> Self {
        Self {
            changes,
            ..Default::default()
        }
    }

    /// Add snapshot records stamped at `now`.
    pub fn with_snapshot(mut self, items: Vec<SnapshotItem>, now: Timestamp) -> Self {
        self.snapshot = items.into_iter().map(|s| s.at(now)).collect();
        self
    }

    /// Add the most recent push batch.
    pub fn with_pushed(mut self, items: &[PushedItem]) -> Self {
        self.pushed = items.iter().map(PushedItem::to_item).collect();
        self
    }

    pub fn len(&self) -> usize {
        self.changes.len() + self.snapshot.len() + self.pushed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merge the sources into at most `limit` items, one per id, newest first.
///
/// Items are ordered by descending `ts`; for equal `ts` the input order
/// (log, then snapshot, then pushed) is kept, so the first occurrence of an
/// id in that order is the one returned.
pub fn merge(sources: PullSources, limit: usize) -> Vec<SyncItem> {
    let mut all: Vec<SyncItem> = Vec::with_capacity(sources.len());
    all.extend(sources.changes.into_iter().map(SyncItem::from));
    all.extend(sources.snapshot);
    all.extend(sources.pushed);

    // sort_by is stable
    all.sort_by(|a, b| b.ts.cmp(&a.ts));

    let mut seen = HashSet::with_capacity(all.len().min(limit));
    let mut merged = Vec::with_capacity(all.len().min(limit));
    for item in all {
        if merged.len() >= limit {
            break;
        }
        if seen.insert(item.id.clone()) {
            merged.push(item);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeType;

    fn entry(ts: Timestamp, id: &str) -> ChangeLogEntry {
        ChangeLogEntry::new(ts, id, ChangeType::Upsert, None)
    }

    fn ids(items: &[SyncItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn window_defaults() {
        assert_eq!(PullWindow::parse(None, None), PullWindow::default());
        assert_eq!(PullWindow::parse(Some(""), Some("  ")), PullWindow::default());
        assert_eq!(
            PullWindow::parse(Some("abc"), Some("NaN")),
            PullWindow::default()
        );
        assert_eq!(
            PullWindow::parse(Some("inf"), Some("-infinity")),
            PullWindow::default()
        );
    }

    #[test]
    fn window_clamps() {
        assert_eq!(PullWindow::parse(Some("-5"), None).since, 0);
        assert_eq!(PullWindow::parse(None, Some("999999")).limit, MAX_LIMIT);
        assert_eq!(PullWindow::parse(None, Some("0")).limit, MIN_LIMIT);
        assert_eq!(PullWindow::parse(None, Some("-3")).limit, MIN_LIMIT);
        assert_eq!(
            PullWindow::parse(Some("1500.9"), Some("25.7")),
            PullWindow {
                since: 1500,
                limit: 25,
                first_sync: false,
            }
        );
    }

    #[test]
    fn window_snapshot_only_on_first_sync() {
        assert!(PullWindow::parse(Some("-5"), None).wants_snapshot());
        assert!(!PullWindow::parse(Some("1"), None).wants_snapshot());
    }

    #[test]
    fn window_fractional_since_is_not_first_sync() {
        let window = PullWindow::parse(Some("0.5"), None);
        assert_eq!(window.since, 0);
        assert!(!window.wants_snapshot());
        assert!(PullWindow::parse(Some("0"), None).wants_snapshot());
        assert!(PullWindow::parse(Some("-0.5"), None).wants_snapshot());
    }

    #[test]
    fn merge_orders_newest_first() {
        let sources = PullSources::new(vec![entry(10, "a"), entry(30, "b"), entry(20, "c")]);
        let merged = merge(sources, 10);
        assert_eq!(ids(&merged), vec!["b", "c", "a"]);
    }

    #[test]
    fn merge_keeps_freshest_per_id() {
        let sources = PullSources::new(vec![entry(100, "S2"), entry(200, "S2")])
            .with_snapshot(vec![SnapshotItem::new("S2", None)], 150)
            .with_pushed(&[PushedItem {
                id: "S2".into(),
                ts: 120,
                url: None,
            }]);

        let merged = merge(sources, 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].ts, 200);
    }

    #[test]
    fn merge_prefers_log_on_equal_ts() {
        let sources = PullSources {
            changes: vec![ChangeLogEntry::new(50, "S1", ChangeType::Delete, None)],
            ..Default::default()
        }
        .with_pushed(&[PushedItem {
            id: "S1".into(),
            ts: 50,
            url: None,
        }]);

        let merged = merge(sources, 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].change_type, ChangeType::Delete);
    }

    #[test]
    fn merge_respects_limit() {
        let sources = PullSources::new((1..=5).map(|i| entry(i, &format!("r{i}"))).collect());
        let merged = merge(sources, 1);
        assert_eq!(ids(&merged), vec!["r5"]);
    }

    #[test]
    fn merge_limit_counts_distinct_ids() {
        let sources = PullSources::new(vec![
            entry(50, "a"),
            entry(40, "a"),
            entry(30, "a"),
            entry(20, "b"),
        ]);
        let merged = merge(sources, 2);
        assert_eq!(ids(&merged), vec!["a", "b"]);
    }

    #[test]
    fn merge_empty() {
        assert!(merge(PullSources::default(), 10).is_empty());
    }
}
