//! Request handlers for sync operations.

mod checkpoint;
mod pull;
mod push;

pub use checkpoint::*;
pub use pull::*;
pub use push::*;

use scoresync_engine::Timestamp;

/// Server wall clock in milliseconds since the epoch.
pub(crate) fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}
