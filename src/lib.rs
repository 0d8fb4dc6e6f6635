//! Declarative proxy-config compiler and transactional sync engine.
//!
//! Routing records (the desired state) are compiled into a full JSON
//! configuration document for a proxy with an administrative HTTP API,
//! validated, snapshotted, and pushed in one atomic load. A failed push rolls
//! back to an earlier snapshot. The reverse direction imports a legacy
//! configuration file back into records.
//!
//! # Architecture Overview
//!
//! ```text
//!   RecordStore ──▶ compile ──▶ validate ──▶ SyncManager ──▶ AdminClient ──▶ proxy
//!   (records)       (pure)      (pure)       │  snapshots      POST /load
//!       ▲                                    │  audit log
//!       │                                    ▼
//!   into_records ◀── extract_hosts ◀── ConfigAdapter ◀── legacy file
//! ```

// Core model
pub mod model;
pub mod records;

// Compile / validate / apply
pub mod client;
pub mod compile;
pub mod sync;
pub mod validate;

// Reverse direction
pub mod import;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::SyncConfig;
pub use lifecycle::Shutdown;
pub use model::Config;
pub use sync::SyncManager;
