//! Desired-state records and audit rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Setting key holding the certificate-automation contact address.
pub const ACME_EMAIL_SETTING: &str = "caddy.acme_email";

/// One reverse-proxy mapping: domains → target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutingRecord {
    /// Stable identifier (UUID v4 for records created here).
    pub id: String,

    /// Display name; defaults to the domain list for imported records.
    #[serde(default)]
    pub name: String,

    /// Comma-separated domain names.
    pub domain_names: String,

    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    pub forward_scheme: String,

    pub forward_host: String,
    pub forward_port: u16,

    /// Redirect plaintext requests to HTTPS.
    #[serde(default)]
    pub ssl_forced: bool,

    #[serde(default)]
    pub hsts_enabled: bool,

    #[serde(default)]
    pub hsts_subdomains: bool,

    #[serde(default)]
    pub block_exploits: bool,

    #[serde(default)]
    pub websocket_support: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path-scoped overrides, matched before the catch-all route.
    #[serde(default)]
    pub locations: Vec<PathRule>,
}

impl RoutingRecord {
    /// Create an enabled record with default flags.
    pub fn new(
        domain_names: impl Into<String>,
        forward_host: impl Into<String>,
        forward_port: u16,
    ) -> Self {
        let domain_names = domain_names.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: domain_names.clone(),
            domain_names,
            forward_scheme: default_scheme(),
            forward_host: forward_host.into(),
            forward_port,
            ssl_forced: false,
            hsts_enabled: false,
            hsts_subdomains: false,
            block_exploits: false,
            websocket_support: false,
            enabled: true,
            locations: Vec::new(),
        }
    }

    /// Trimmed, non-empty domains from the comma-separated field.
    pub fn domains(&self) -> Vec<&str> {
        self.domain_names
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect()
    }
}

/// A path prefix routed to its own target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathRule {
    /// Path prefix, e.g. `/api`.
    pub path: String,

    #[serde(default = "default_scheme")]
    pub forward_scheme: String,

    pub forward_host: String,
    pub forward_port: u16,
}

/// One row per apply attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuditRecord {
    /// SHA-256 (hex) of the compact JSON document.
    pub config_hash: String,
    pub applied_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_enabled() -> bool {
    true
}
