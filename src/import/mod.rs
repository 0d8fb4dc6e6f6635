//! Legacy configuration import subsystem.
//!
//! # Data Flow
//! ```text
//! legacy file
//!     → ConfigAdapter::adapt (external process)      all-or-nothing
//!     → extract_hosts: servers → routes → host matchers
//!         first occurrence wins, later ones are conflicts
//!     → detect_conflicts against managed records      informational
//!     → caller picks resolutions
//!     → into_records → RecordStore
//! ```
//!
//! # Design Decisions
//! - The adapter is injected, so tests never shell out
//! - Unsupported handlers produce warnings, never drop a candidate
//! - Candidates without a target survive review but never become records

pub mod adapter;
pub mod extract;
pub mod importer;
pub mod types;

pub use adapter::{CaddyfileAdapter, ConfigAdapter};
pub use extract::{detect_conflicts, extract_hosts, into_records};
pub use importer::{backup_file, Importer};
pub use types::{ImportError, ImportResult, ParsedHost, Resolution};
