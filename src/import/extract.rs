//! Host extraction from an adapted document, and conversion to records.

use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::import::types::{ImportError, ImportResult, ParsedHost, Resolution};
use crate::model::handler::{FILE_SERVER, REWRITE, SUBROUTE};
use crate::model::{split_host_port, Config, Handler, ReverseProxyHandler, Route, Server};
use crate::records::RoutingRecord;

pub const REWRITE_WARNING: &str = "Rewrite rules not supported - manual configuration required";
pub const FILE_SERVER_WARNING: &str = "File server directives not supported";
pub const RENAME_SUFFIX: &str = "-imported";

/// Walk every server, route and host matcher of a JSON document.
///
/// A path-less matcher owns its host: the first one wins and later ones
/// become conflicts. Path-scoped matchers only stand in for a host until its
/// own route shows up, and never conflict.
pub fn extract_hosts(json: &[u8]) -> Result<ImportResult, ImportError> {
    let config: Config = serde_json::from_slice(json)?;
    let mut result = ImportResult::default();
    // domain -> (slot in `result.hosts`, claimed by a path-less matcher)
    let mut seen: HashMap<String, (usize, bool)> = HashMap::new();

    for (server_name, server) in config.servers() {
        for (index, route) in server.routes.iter().enumerate() {
            for matcher in &route.matchers {
                let catch_all = matcher.path.is_empty();
                for domain in &matcher.host {
                    match seen.get(domain.as_str()).copied() {
                        None => {
                            seen.insert(domain.clone(), (result.hosts.len(), catch_all));
                            result
                                .hosts
                                .push(parse_host(domain, server_name, index, server, route));
                        }
                        Some((slot, false)) if catch_all => {
                            result.hosts[slot] =
                                parse_host(domain, server_name, index, server, route);
                            seen.insert(domain.clone(), (slot, true));
                        }
                        Some(_) if catch_all => {
                            result
                                .conflicts
                                .push(format!("Duplicate domain detected: {}", domain));
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }

    Ok(result)
}

fn parse_host(
    domain: &str,
    server_name: &str,
    index: usize,
    server: &Server,
    route: &Route,
) -> ParsedHost {
    let mut host = ParsedHost {
        domain_names: domain.to_string(),
        forward_scheme: "http".to_string(),
        ssl_forced: domain.starts_with("https") || server.tls_connection_policies.is_some(),
        ..Default::default()
    };

    let handlers = flatten_handlers(&route.handle);

    if let Some(proxy) = handlers.iter().find_map(|h| match h {
        Handler::ReverseProxy(proxy) => Some(proxy),
        _ => None,
    }) {
        apply_upstream(&mut host, proxy);
    }

    for handler in &handlers {
        match handler.kind() {
            Some(REWRITE) => host.warnings.push(REWRITE_WARNING.to_string()),
            Some(FILE_SERVER) => host.warnings.push(FILE_SERVER_WARNING.to_string()),
            _ => {}
        }
    }

    host.raw_json = serde_json::to_value(route)
        .and_then(|data| {
            serde_json::to_string(&json!({"server": server_name, "route": index, "data": data}))
        })
        .unwrap_or_default();
    host
}

fn apply_upstream(host: &mut ParsedHost, proxy: &ReverseProxyHandler) {
    if let Some(upstream) = proxy.upstreams.first() {
        if let Ok((target, port)) = split_host_port(&upstream.dial) {
            host.forward_host = target.to_string();
            host.forward_port = port.parse().unwrap_or(0);
        }
    }
    host.websocket_support = proxy.passes_upgrade();
    if proxy.uses_tls() {
        host.forward_scheme = "https".to_string();
    }
}

/// Handlers of a route in execution order, with `subroute` handlers replaced
/// by the handlers of their nested routes.
fn flatten_handlers(handlers: &[Handler]) -> Vec<Handler> {
    let mut out = Vec::new();
    for handler in handlers {
        match handler {
            Handler::Passthrough(map) if handler.kind() == Some(SUBROUTE) => {
                let nested: Vec<Route> = map
                    .get("routes")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
                for route in &nested {
                    out.extend(flatten_handlers(&route.handle));
                }
            }
            other => out.push(other.clone()),
        }
    }
    out
}

/// Add a conflict for every candidate domain already managed by a record.
pub fn detect_conflicts(result: &mut ImportResult, existing: &[RoutingRecord]) {
    let managed: HashSet<&str> = existing.iter().flat_map(|r| r.domains()).collect();
    for host in &result.hosts {
        if managed.contains(host.domain_names.as_str()) {
            result
                .conflicts
                .push(format!("Domain '{}' is already managed", host.domain_names));
        }
    }
}

/// Convert candidates into records, applying the caller's resolutions keyed
/// by domain. Candidates without a target are dropped.
pub fn into_records(
    hosts: &[ParsedHost],
    resolutions: &HashMap<String, Resolution>,
) -> Vec<RoutingRecord> {
    let mut records = Vec::new();

    for host in hosts.iter().filter(|h| h.is_actionable()) {
        let resolution = resolutions.get(&host.domain_names).copied().unwrap_or_default();
        let domain = match resolution {
            Resolution::Skip => continue,
            Resolution::Rename => format!("{}{}", host.domain_names, RENAME_SUFFIX),
            Resolution::Import => host.domain_names.clone(),
        };

        let mut record =
            RoutingRecord::new(domain.clone(), host.forward_host.clone(), host.forward_port);
        record.name = domain;
        record.forward_scheme = host.forward_scheme.clone();
        record.ssl_forced = host.ssl_forced;
        record.websocket_support = host.websocket_support;
        records.push(record);
    }

    records
}
