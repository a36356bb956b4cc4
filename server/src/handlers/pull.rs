//! Pull handler - serves merged change items to clients.

use crate::error::Result;
use crate::recent::RecentPushes;
use crate::store::SyncStore;
use scoresync_engine::{merge, PullSources, PullWindow, SyncItem, Timestamp};
use serde::Serialize;

/// Query parameters for pull sync.
///
/// Both values arrive as raw strings so that garbage falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Default)]
pub struct PullQuery {
    /// Only changes strictly after this timestamp
    pub since: Option<String>,
    /// Maximum number of items to return
    pub limit: Option<String>,
}

impl PullQuery {
    /// Build from raw query pairs. The first occurrence of a repeated key
    /// wins; unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "since" => &mut query.since,
                "limit" => &mut query.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }

    pub fn window(&self) -> PullWindow {
        PullWindow::parse(self.since.as_deref(), self.limit.as_deref())
    }
}

/// Response for pull sync.
#[derive(Debug, Serialize)]
pub struct PullResponse {
    pub items: Vec<SyncItem>,
}

/// Process a pull request from a client.
pub async fn handle_pull(
    store: &dyn SyncStore,
    recent: &RecentPushes,
    query: PullQuery,
    now: Timestamp,
) -> Result<PullResponse> {
    let window = query.window();

    let changes = store
        .query(window.since, window.limit)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                since = ?query.since,
                limit = ?query.limit,
                error = %e,
                "sync_pull failed"
            );
        })?;

    let mut sources = PullSources::new(changes);
    if window.wants_snapshot() {
        let snapshot = store.snapshot().await.inspect_err(|e| {
            tracing::warn!(error = %e, "sync_pull snapshot failed");
        })?;
        sources = sources.with_snapshot(snapshot, now);
    }
    let pushed = recent.items().await;
    let sources = sources.with_pushed(&pushed);

    let (from_log, from_snapshot, from_pushed) = (
        sources.changes.len(),
        sources.snapshot.len(),
        sources.pushed.len(),
    );
    let items = merge(sources, window.limit);

    tracing::info!(
        since = window.since,
        limit = window.limit,
        from_log,
        from_snapshot,
        from_pushed,
        returned = items.len(),
        "sync_pull"
    );

    Ok(PullResponse { items })
}
