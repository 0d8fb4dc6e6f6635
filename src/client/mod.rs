//! Control-plane client.
//!
//! # Data Flow
//! ```text
//! SyncManager
//!     → AdminClient::load(config)   POST <base>/load
//!     → AdminClient::get_config()   GET  <base>/config/
//!     → proxy admin API
//! ```
//!
//! # Design Decisions
//! - One request per call, no retries; atomicity belongs to the proxy
//! - Every request bounded by the client timeout (default 30s)
//! - Non-2xx responses keep status and body for the operator

pub mod admin;

pub use admin::{AdminClient, ClientError, ClientResult, DEFAULT_TIMEOUT};
