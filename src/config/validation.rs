//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, retention >= 1)
//! - Check URLs and socket addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SyncConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SyncConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("admin.url '{url}' is invalid: {reason}")]
    AdminUrl { url: String, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

pub fn validate_config(config: &SyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.admin.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::AdminUrl {
            url: config.admin.url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::AdminUrl {
            url: config.admin.url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.admin.timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "admin.timeout_secs",
        });
    }
    if config.storage.snapshot_keep == 0 {
        errors.push(ValidationError::Zero {
            field: "storage.snapshot_keep",
        });
    }

    let paths = [
        ("storage.config_dir", &config.storage.config_dir),
        ("store.records_path", &config.store.records_path),
        ("store.audit_path", &config.store.audit_path),
        ("import.adapter_binary", &config.import.adapter_binary),
    ];
    for (field, path) in paths {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::Empty { field });
        }
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "observability.log_level",
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
