//! Routing records → configuration document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{
    join_host_port, Apps, AutoHttps, Automation, AutomationPolicy, Config, Handler, HttpApp,
    LogConfig, LogEncoder, LogWriter, Logging, MatcherSet, Route, Server, ServerLogs, Storage,
    TlsApp,
};
use crate::records::{PathRule, RoutingRecord};

pub const SERVER_NAME: &str = "srv0";
pub const LISTEN_HTTP: &str = ":80";
pub const LISTEN_HTTPS: &str = ":443";
pub const ACCESS_LOGGER: &str = "access_log";
pub const ACCESS_LOG_FILE: &str = "access.log";
pub const HSTS_MAX_AGE: &str = "max-age=31536000";

const LOG_ROLL_SIZE_MB: u32 = 10;
const LOG_ROLL_KEEP: u32 = 5;
const LOG_ROLL_KEEP_DAYS: u32 = 7;

/// Bad input data. Never retried; the record's owner must fix it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("proxy host {record} has empty domain names")]
    EmptyDomain { record: String },
}

/// Compile routing records into a full configuration document.
pub fn compile(
    records: &[RoutingRecord],
    storage_root: &Path,
    cert_email: &str,
) -> Result<Config, CompileError> {
    let mut routes = Vec::new();

    for record in records.iter().filter(|r| r.enabled) {
        let domains: Vec<String> = record.domains().into_iter().map(String::from).collect();
        if domains.is_empty() {
            return Err(CompileError::EmptyDomain {
                record: record.id.clone(),
            });
        }

        for rule in &record.locations {
            routes.push(path_route(&domains, rule, record.websocket_support));
        }
        routes.push(catch_all_route(domains, record));
    }

    let mut servers = BTreeMap::new();
    servers.insert(
        SERVER_NAME.to_string(),
        Server {
            listen: vec![LISTEN_HTTP.to_string(), LISTEN_HTTPS.to_string()],
            routes,
            automatic_https: Some(AutoHttps::default()),
            logs: Some(ServerLogs {
                default_logger_name: Some(ACCESS_LOGGER.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    );

    Ok(Config {
        logging: Some(access_logging(&log_root_for(storage_root))),
        apps: Apps {
            http: Some(HttpApp {
                servers,
                ..Default::default()
            }),
            tls: tls_app(cert_email),
            ..Default::default()
        },
        storage: Some(Storage {
            module: "file_system".to_string(),
            root: storage_root.to_string_lossy().into_owned(),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Logs live beside the data directory: `<storage_root>/../../logs`.
pub fn log_root_for(storage_root: &Path) -> PathBuf {
    storage_root
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""))
        .join("logs")
}

fn path_route(domains: &[String], rule: &PathRule, websocket: bool) -> Route {
    let dial = join_host_port(&rule.forward_host, rule.forward_port);
    Route {
        matchers: vec![MatcherSet {
            host: domains.to_vec(),
            path: vec![rule.path.clone(), format!("{}/*", rule.path.trim_end_matches('/'))],
            ..Default::default()
        }],
        handle: vec![Handler::reverse_proxy(
            dial,
            websocket,
            is_https(&rule.forward_scheme),
        )],
        terminal: true,
        ..Default::default()
    }
}

fn catch_all_route(domains: Vec<String>, record: &RoutingRecord) -> Route {
    let mut handle = Vec::new();

    if record.hsts_enabled {
        let mut value = HSTS_MAX_AGE.to_string();
        if record.hsts_subdomains {
            value.push_str("; includeSubDomains");
        }
        handle.push(Handler::response_header("Strict-Transport-Security", value));
    }

    if record.block_exploits {
        handle.push(Handler::BlockExploits);
    }

    handle.push(Handler::reverse_proxy(
        join_host_port(&record.forward_host, record.forward_port),
        record.websocket_support,
        is_https(&record.forward_scheme),
    ));

    Route {
        matchers: vec![MatcherSet {
            host: domains,
            ..Default::default()
        }],
        handle,
        terminal: true,
        ..Default::default()
    }
}

fn tls_app(cert_email: &str) -> Option<TlsApp> {
    if cert_email.is_empty() {
        return None;
    }

    let issuer = |module: &str| {
        let mut issuer = Map::new();
        issuer.insert("module".to_string(), Value::String(module.to_string()));
        issuer.insert("email".to_string(), Value::String(cert_email.to_string()));
        issuer
    };

    Some(TlsApp {
        automation: Some(Automation {
            policies: vec![AutomationPolicy {
                issuers: vec![issuer("acme"), issuer("zerossl")],
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn access_logging(log_root: &Path) -> Logging {
    let mut logs = BTreeMap::new();
    logs.insert(
        "access".to_string(),
        LogConfig {
            writer: Some(LogWriter {
                output: "file".to_string(),
                filename: Some(log_root.join(ACCESS_LOG_FILE).to_string_lossy().into_owned()),
                roll: Some(true),
                roll_size_mb: Some(LOG_ROLL_SIZE_MB),
                roll_keep: Some(LOG_ROLL_KEEP),
                roll_keep_days: Some(LOG_ROLL_KEEP_DAYS),
                ..Default::default()
            }),
            encoder: Some(LogEncoder {
                format: "json".to_string(),
                ..Default::default()
            }),
            level: Some("INFO".to_string()),
            include: vec![format!("http.log.access.{}", ACCESS_LOGGER)],
            ..Default::default()
        },
    );
    Logging {
        logs,
        ..Default::default()
    }
}

fn is_https(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("https")
}
