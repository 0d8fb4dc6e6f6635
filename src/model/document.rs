//! Configuration document definitions.
//!
//! Mirrors the JSON structure accepted by the proxy's `POST /load` endpoint.
//! All types derive Serde traits; absent fields take their defaults so
//! partial documents (adapter output, empty configs) decode cleanly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::handler::Handler;

/// Root of the proxy configuration document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Named loggers (access log sink).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Logging>,

    /// App modules (`http`, `tls`).
    #[serde(skip_serializing_if = "Apps::is_empty")]
    pub apps: Apps,

    /// Certificate storage backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// True when nothing at all is configured.
    pub fn is_empty(&self) -> bool {
        self.logging.is_none()
            && self.apps.is_empty()
            && self.storage.is_none()
            && self.extra.is_empty()
    }

    /// The HTTP app's servers, if any.
    pub fn servers(&self) -> impl Iterator<Item = (&String, &Server)> {
        self.apps.http.iter().flat_map(|http| http.servers.iter())
    }
}

/// App modules.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Apps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpApp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsApp>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Apps {
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.tls.is_none() && self.extra.is_empty()
    }
}

/// HTTP app: named server instances.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpApp {
    pub servers: BTreeMap<String, Server>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One HTTP server instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Server {
    /// Listen addresses (e.g. `":443"`).
    pub listen: Vec<String>,

    /// Routes, evaluated in order; first match wins.
    pub routes: Vec<Route>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic_https: Option<AutoHttps>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<ServerLogs>,

    /// Opaque; only its presence is inspected (by the importer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_connection_policies: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Automatic HTTPS behaviour for a server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AutoHttps {
    #[serde(skip_serializing_if = "is_false")]
    pub disable: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub disable_redirects: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skip: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Access-log wiring for a server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerLogs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_logger_name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A route: matcher sets plus an ordered handler chain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Route {
    /// Matcher sets, OR-ed together. Empty matches everything.
    #[serde(rename = "match", skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatcherSet>,

    /// Handler chain, executed in order.
    pub handle: Vec<Handler>,

    /// Stop evaluating further routes once this one matches.
    pub terminal: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Route {
    /// All host strings this route matches on, across matcher sets.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().flat_map(|m| m.host.iter().map(String::as_str))
    }
}

/// A single matcher set; populated fields are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatcherSet {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// TLS app: certificate automation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsApp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<Automation>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Automation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<AutomationPolicy>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Certificate management policy. Issuers are free-form module maps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AutomationPolicy {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issuers: Vec<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Top-level logging section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    pub logs: BTreeMap<String, LogConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<LogWriter>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<LogEncoder>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Log sink with size/age rotation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogWriter {
    pub output: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_size_mb: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_keep: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_keep_days: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogEncoder {
    pub format: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Certificate storage backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Storage {
    pub module: String,
    pub root: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}
