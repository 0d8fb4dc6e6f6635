//! Desired-state records subsystem.
//!
//! # Data Flow
//! ```text
//! CRUD layer (external)
//!     → RecordStore (list_records, setting)
//!     → SyncManager (compile + apply)
//!     → RecordStore (append_audit)
//!
//! watch mode:
//!     watcher.rs detects a change to the records file
//!     → tick on channel
//!     → one apply per tick, serialized by the consumer loop
//! ```
//!
//! # Design Decisions
//! - The store is a trait: the sync engine never assumes a backend
//! - Audit rows are append-only and never read for control flow
//! - Records are returned in stable order so compiled output is stable

pub mod store;
pub mod types;
pub mod watcher;

pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError, StoreFile, StoreResult};
pub use types::{AuditRecord, PathRule, RoutingRecord, ACME_EMAIL_SETTING};
pub use watcher::RecordsWatcher;
