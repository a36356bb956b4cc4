//! # scoresync engine
//!
//! Deterministic core of the scoresync offline-first sync subsystem.
//!
//! Clients edit student and assessment records while disconnected and push
//! the edits later as change records. The server applies them to a single
//! authoritative store with last-write-wins semantics, logs every applied
//! change, and answers pulls by merging the log with a first-sync snapshot and
//! the most recent push batch.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about HTTP, databases or clocks;
//!   "now" is always passed in
//! - **Deterministic**: same inputs always produce same outputs
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! - [`ChangeRecord`] - a client mutation (upsert or delete), parsed from loose
//!   JSON with [`ChangeRecord::from_value`]
//! - [`Record`] - the authoritative state of one record (tombstoned on delete)
//! - [`decide`] - weighs a change against the stored record under a
//!   [`ConflictPolicy`] and yields a [`Decision`]
//! - [`ChangeLogEntry`] - the append-only trace of an applied change
//! - [`merge`] - combines [`PullSources`] into deduplicated [`SyncItem`]s
//!
//! ## Quick Start
//!
//! ```rust
//! use scoresync_engine::{
//!     decide, merge, ChangeRecord, ConflictPolicy, Decision, PullSources, PullWindow,
//! };
//! use serde_json::json;
//!
//! let change = ChangeRecord::upsert("S1", json!({"name": "Alice"}), 1, "c1", 1000);
//!
//! let Decision::Write { record, entry } =
//!     decide(None, &change, ConflictPolicy::LastWriteWins).unwrap()
//! else {
//!     unreachable!()
//! };
//! assert_eq!(record.doc, json!({"name": "Alice"}));
//!
//! let window = PullWindow::parse(Some("0"), Some("100"));
//! let items = merge(PullSources::new(vec![entry]), window.limit);
//! assert_eq!(items[0].id, "S1");
//! assert_eq!(items[0].ts, 1000);
//! ```

pub mod apply;
pub mod change;
pub mod error;
pub mod item;
pub mod log;
pub mod merge;
pub mod record;

// Re-export main types at crate root
pub use apply::{decide, ConflictPolicy, Decision, SkipReason};
pub use change::{ChangeRecord, ChangeType, DEFAULT_CLIENT_ID, DEFAULT_VERSION};
pub use error::Error;
pub use item::{PushedItem, SnapshotItem, SyncItem};
pub use log::{checkpoint, ChangeLogEntry};
pub use merge::{merge, PullSources, PullWindow, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};
pub use record::{Record, Stamp};

/// Type aliases for clarity
pub type RecordId = String;
pub type ClientId = String;
pub type Version = u64;
pub type Timestamp = i64;
