//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! sync / import / client produce:
//!     → tracing events with structured fields
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The library only emits; the binary installs subscriber and recorder

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
