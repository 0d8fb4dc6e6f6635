//! Config compilation subsystem.
//!
//! # Data Flow
//! ```text
//! RoutingRecord[] + storage root + certificate contact
//!     → skip disabled records
//!     → split domains into host matchers
//!     → per record: PathRule routes, then the catch-all route
//!     → one server, TLS automation policy, logging, storage
//!     → Config
//! ```
//!
//! # Design Decisions
//! - Pure function: no I/O, no clock, no randomness
//! - Route order follows record order; path routes always precede their
//!   record's catch-all so first-match-wins picks the specific rule
//! - Fails on the first bad record; never returns a partial document

mod generate;

pub use generate::{
    compile, log_root_for, CompileError, ACCESS_LOGGER, ACCESS_LOG_FILE, HSTS_MAX_AGE, LISTEN_HTTP,
    LISTEN_HTTPS, SERVER_NAME,
};
