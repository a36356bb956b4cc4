//! Most recent push batch.
//!
//! A single slot holding the changes applied by the last push, so a pull
//! issued right after a push sees them. It is replaced, never appended to,
//! and lives only as long as the process. It is not a durability mechanism:
//! the change log is the source of truth.

use scoresync_engine::PushedItem;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct RecentPushes {
    slot: RwLock<Arc<[PushedItem]>>,
}

impl Default for RecentPushes {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentPushes {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Replace the buffered batch.
    pub async fn replace(&self, items: Vec<PushedItem>) {
        *self.slot.write().await = items.into();
    }

    /// The buffered batch.
    pub async fn items(&self) -> Arc<[PushedItem]> {
        self.slot.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, ts: i64) -> PushedItem {
        PushedItem {
            id: id.into(),
            ts,
            url: None,
        }
    }

    #[tokio::test]
    async fn starts_empty() {
        assert!(RecentPushes::new().items().await.is_empty());
    }

    #[tokio::test]
    async fn replace_discards_previous_batch() {
        let recent = RecentPushes::new();
        recent.replace(vec![item("S1", 1), item("S2", 2)]).await;
        recent.replace(vec![item("S3", 3)]).await;

        assert_eq!(&*recent.items().await, &[item("S3", 3)]);
    }

    #[tokio::test]
    async fn readers_keep_their_copy() {
        let recent = RecentPushes::new();
        recent.replace(vec![item("S1", 1)]).await;

        let held = recent.items().await;
        recent.replace(Vec::new()).await;

        assert_eq!(held.len(), 1);
        assert!(recent.items().await.is_empty());
    }
}
