//! Sync engine subsystem.
//!
//! # Data Flow
//! ```text
//! RecordStore ──▶ compile ──▶ validate ──▶ snapshot.rs (config-<seq>.json)
//!                                               │
//!                                               ▼
//!                                       AdminClient::load
//!                                          │         │
//!                                       2xx│         │error
//!                                          ▼         ▼
//!                      audit + last-good + prune   rollback target ──▶ AdminClient::load
//!                                                        │
//!                                                        ▼
//!                                           audit(failure), RolledBack / RollbackFailed
//! ```
//!
//! # Design Decisions
//! - Snapshots are ordered by an explicit sequence number, never by mtime
//! - Rollback defaults to the last snapshot the proxy accepted, not the one
//!   that just failed
//! - Invalid documents never reach disk or the proxy
//! - Rotation and audit failures are logged, never returned

pub mod manager;
pub mod snapshot;
pub mod types;

pub use manager::{config_hash, SyncManager, DEFAULT_SNAPSHOT_KEEP};
pub use snapshot::{Snapshot, SnapshotError, SnapshotStore};
pub use types::{ApplyReport, ApplyState, RollbackError, RollbackTarget, SyncError};
