//! Proxy configuration document model.
//!
//! # Data Flow
//! ```text
//! RoutingRecord[]
//!     → compile (builds Config)
//!     → validate (structural checks)
//!     → serde_json (wire form pushed to POST /load)
//!
//! GET /config/ | snapshot file | adapter output
//!     → serde_json
//!     → Config (unknown fields kept in `extra`)
//! ```
//!
//! # Design Decisions
//! - Pure data: no behaviour beyond (de)serialization and small constructors
//! - Every struct keeps unrecognised keys in a flattened `extra` map so a
//!   document fetched from the proxy survives a decode/encode cycle
//! - Maps are `BTreeMap` so output is deterministic
//! - Handlers are a tagged union with an opaque passthrough variant

pub mod address;
pub mod document;
pub mod handler;

pub use address::{join_host_port, split_host_port, AddressError};
pub use document::{
    Apps, AutoHttps, Automation, AutomationPolicy, Config, HttpApp, LogConfig, LogEncoder,
    LogWriter, Logging, MatcherSet, Route, Server, ServerLogs, Storage, TlsApp,
};
pub use handler::{HeaderOps, HeaderRules, Handler, ReverseProxyHandler, Upstream};
