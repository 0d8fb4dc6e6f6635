//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → watch loop finishes current cycle → exit
//! ```
//!
//! # Design Decisions
//! - Only the `watch` command is long-running; one-shot commands ignore this
//! - Shutdown never interrupts an apply cycle mid-flight

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{shutdown_on_signal, wait_for_signal};
