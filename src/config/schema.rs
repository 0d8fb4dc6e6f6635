//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sync
//! engine. All types derive Serde traits for deserialization from TOML.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::observability::LogFormat;
use crate::sync::RollbackTarget;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Proxy admin endpoint.
    pub admin: AdminConfig,

    /// Snapshot directory and retention.
    pub storage: StorageConfig,

    /// Desired-state record store and audit log.
    pub store: StoreConfig,

    /// Legacy configuration import.
    pub import: ImportConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin API base URL (e.g., "http://localhost:2019").
    pub url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:2019".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for snapshots (`snapshots/`) and proxy data (`data/`).
    pub config_dir: PathBuf,

    /// Snapshots kept after a successful apply.
    pub snapshot_keep: usize,

    /// Which snapshot a failed push rolls back to.
    pub rollback_target: RollbackTarget,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("data/caddy"),
            snapshot_keep: 10,
            rollback_target: RollbackTarget::LastKnownGood,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding routing records and settings.
    pub records_path: PathBuf,

    /// JSON-lines audit log.
    pub audit_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("data/records.json"),
            audit_path: PathBuf::from("data/audit.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Adapter executable; resolved on PATH when relative.
    pub adapter_binary: PathBuf,

    /// Where imported files are copied after a successful import.
    pub backup_dir: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            adapter_binary: PathBuf::from("caddy"),
            backup_dir: PathBuf::from("data/imports/backups"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}
