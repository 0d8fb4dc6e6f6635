//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → PROXY_SYNC_* environment overrides
//!     → validation.rs (semantic checks)
//!     → SyncConfig (validated, immutable)
//!     → used by main.rs to build client, store, manager, importer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, ImportConfig, ObservabilityConfig, StorageConfig, StoreConfig, SyncConfig,
};
