//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::SyncConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::observability::LogFormat;
use crate::sync::RollbackTarget;

pub const ENV_PREFIX: &str = "PROXY_SYNC_";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    Env { var: String, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "IO error reading {}: {}", path.display(), e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => write!(f, "Invalid value for {}: '{}'", var, value),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: TOML file (if given), then `PROXY_SYNC_*` environment
/// overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content =
                fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => SyncConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Override fields from `lookup(PROXY_SYNC_<NAME>)`.
pub fn apply_overrides<F>(config: &mut SyncConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        let var = format!("{}{}", ENV_PREFIX, name);
        lookup(&var).map(|value| (var, value))
    };

    if let Some((_, v)) = get("ADMIN_URL") {
        config.admin.url = v;
    }
    if let Some((var, v)) = get("ADMIN_TIMEOUT_SECS") {
        config.admin.timeout_secs = parse(var, v)?;
    }
    if let Some((_, v)) = get("CONFIG_DIR") {
        config.storage.config_dir = PathBuf::from(v);
    }
    if let Some((var, v)) = get("SNAPSHOT_KEEP") {
        config.storage.snapshot_keep = parse(var, v)?;
    }
    if let Some((var, v)) = get("ROLLBACK_TARGET") {
        config.storage.rollback_target = match v.as_str() {
            "last_known_good" => RollbackTarget::LastKnownGood,
            "previous" => RollbackTarget::Previous,
            _ => return Err(ConfigError::Env { var, value: v }),
        };
    }
    if let Some((_, v)) = get("RECORDS_PATH") {
        config.store.records_path = PathBuf::from(v);
    }
    if let Some((_, v)) = get("AUDIT_PATH") {
        config.store.audit_path = PathBuf::from(v);
    }
    if let Some((_, v)) = get("ADAPTER_BINARY") {
        config.import.adapter_binary = PathBuf::from(v);
    }
    if let Some((_, v)) = get("BACKUP_DIR") {
        config.import.backup_dir = PathBuf::from(v);
    }
    if let Some((_, v)) = get("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some((var, v)) = get("LOG_FORMAT") {
        config.observability.log_format = match v.as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => return Err(ConfigError::Env { var, value: v }),
        };
    }
    if let Some((var, v)) = get("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse(var, v)?;
    }
    if let Some((_, v)) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = v;
    }

    Ok(())
}

fn parse<T: std::str::FromStr>(var: String, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env { var, value })
}
