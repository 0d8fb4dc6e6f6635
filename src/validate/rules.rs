//! Structural checks over a configuration document.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use serde_json::Value;
use thiserror::Error;

use crate::model::handler::REVERSE_PROXY;
use crate::model::{split_host_port, AddressError, Config, Handler, Route, Server};

/// A structurally invalid document. Never applied, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("config cannot be null")]
    NilConfig,

    #[error("config does not decode: {0}")]
    Decode(String),

    #[error("config has content but no http app")]
    MissingHttpApp,

    #[error("server {server} has no listen addresses")]
    NoListenAddresses { server: String },

    #[error("invalid listen address {addr} in server {server}: {reason}")]
    InvalidListen {
        server: String,
        addr: String,
        reason: ListenError,
    },

    #[error("invalid route {route} in server {server}: route has no handlers")]
    NoHandlers { server: String, route: usize },

    #[error("invalid route {route} in server {server}: duplicate host matcher: {host}")]
    DuplicateHost {
        server: String,
        route: usize,
        host: String,
    },

    #[error(
        "invalid route {route} in server {server}: duplicate host matcher: {host} \
         (path {path} is unreachable after the host's catch-all route)"
    )]
    ShadowedPath {
        server: String,
        route: usize,
        host: String,
        path: String,
    },

    #[error("invalid route {route} in server {server}: invalid handler {handler}: {reason}")]
    InvalidHandler {
        server: String,
        route: usize,
        handler: usize,
        reason: HandlerError,
    },

    #[error("config cannot be serialized: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenError {
    #[error("invalid address format: {0}")]
    Format(#[from] AddressError),

    #[error("invalid port: {0}")]
    Port(String),

    #[error("port {0} out of range (1-65535)")]
    PortRange(u64),

    #[error("invalid IP address: {0}")]
    Ip(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("handler missing 'handler' field")]
    MissingKind,

    #[error("reverse_proxy fields are malformed")]
    MalformedReverseProxy,

    #[error("reverse_proxy has no upstreams")]
    NoUpstreams,

    #[error("upstream {0} missing dial address")]
    MissingDial(usize),

    #[error("upstream {index} has invalid dial address {dial}: {source}")]
    InvalidDial {
        index: usize,
        dial: String,
        source: AddressError,
    },
}

/// Validate a raw JSON document (as read from a file or the proxy).
pub fn validate_value(value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return Err(ValidationError::NilConfig);
    }
    let config: Config =
        serde_json::from_value(value.clone()).map_err(|e| ValidationError::Decode(e.to_string()))?;
    validate(&config)
}

/// Validate a document before it is snapshotted or pushed.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    let Some(http) = &config.apps.http else {
        if config.is_empty() {
            return Ok(());
        }
        return Err(ValidationError::MissingHttpApp);
    };

    for (name, server) in &http.servers {
        validate_server(name, server)?;
    }

    serde_json::to_vec(config).map_err(|e| ValidationError::Serialize(e.to_string()))?;
    Ok(())
}

fn validate_server(name: &str, server: &Server) -> Result<(), ValidationError> {
    if server.listen.is_empty() {
        return Err(ValidationError::NoListenAddresses {
            server: name.to_string(),
        });
    }

    for addr in &server.listen {
        validate_listen_addr(addr).map_err(|reason| ValidationError::InvalidListen {
            server: name.to_string(),
            addr: addr.clone(),
            reason,
        })?;
    }

    let mut claims = HostClaims::default();
    for (index, route) in server.routes.iter().enumerate() {
        if route.handle.is_empty() {
            return Err(ValidationError::NoHandlers {
                server: name.to_string(),
                route: index,
            });
        }

        claims.check(name, index, route)?;

        for (handler_index, handler) in route.handle.iter().enumerate() {
            validate_handler(handler).map_err(|reason| ValidationError::InvalidHandler {
                server: name.to_string(),
                route: index,
                handler: handler_index,
                reason,
            })?;
        }
    }

    Ok(())
}

/// Hosts claimed so far within one server.
///
/// A host-only matcher claims the host outright; after that nothing else in
/// the server can reach it. Path-scoped matchers may precede the claim as
/// long as each (host, path) pair is unique.
#[derive(Default)]
struct HostClaims<'a> {
    catch_all: HashMap<&'a str, usize>,
    scoped: HashSet<(&'a str, &'a str)>,
}

impl<'a> HostClaims<'a> {
    fn check(
        &mut self,
        server: &str,
        index: usize,
        route: &'a Route,
    ) -> Result<(), ValidationError> {
        for matcher in &route.matchers {
            for host in &matcher.host {
                let host = host.as_str();

                if matcher.path.is_empty() {
                    if self.catch_all.insert(host, index).is_some() {
                        return Err(ValidationError::DuplicateHost {
                            server: server.to_string(),
                            route: index,
                            host: host.to_string(),
                        });
                    }
                    continue;
                }

                for path in &matcher.path {
                    if self.catch_all.contains_key(host) {
                        return Err(ValidationError::ShadowedPath {
                            server: server.to_string(),
                            route: index,
                            host: host.to_string(),
                            path: path.clone(),
                        });
                    }
                    if !self.scoped.insert((host, path.as_str())) {
                        return Err(ValidationError::DuplicateHost {
                            server: server.to_string(),
                            route: index,
                            host: host.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_listen_addr(addr: &str) -> Result<(), ListenError> {
    // Strip network prefix (tcp/, udp/).
    let addr = addr.split_once('/').map(|(_, rest)| rest).unwrap_or(addr);

    let (host, port) = split_host_port(addr)?;
    let port: u64 = port.parse().map_err(|_| ListenError::Port(port.to_string()))?;
    if !(1..=65535).contains(&port) {
        return Err(ListenError::PortRange(port));
    }

    if !host.is_empty() && host.parse::<IpAddr>().is_err() {
        return Err(ListenError::Ip(host.to_string()));
    }
    Ok(())
}

fn validate_handler(handler: &Handler) -> Result<(), HandlerError> {
    match handler {
        Handler::ReverseProxy(proxy) => {
            if proxy.upstreams.is_empty() {
                return Err(HandlerError::NoUpstreams);
            }
            for (index, upstream) in proxy.upstreams.iter().enumerate() {
                if upstream.dial.is_empty() {
                    return Err(HandlerError::MissingDial(index));
                }
                let invalid = |source| HandlerError::InvalidDial {
                    index,
                    dial: upstream.dial.clone(),
                    source,
                };
                let (_, port) = split_host_port(&upstream.dial).map_err(invalid)?;
                if port.is_empty() {
                    return Err(invalid(AddressError::MissingPort(upstream.dial.clone())));
                }
            }
            Ok(())
        }
        Handler::Passthrough(_) => match handler.kind() {
            None => Err(HandlerError::MissingKind),
            Some(REVERSE_PROXY) => Err(HandlerError::MalformedReverseProxy),
            Some(_) => Ok(()),
        },
        Handler::Headers(_) | Handler::BlockExploits => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::model::{HttpApp, MatcherSet};
    use crate::records::{PathRule, RoutingRecord};
    use serde_json::json;
    use std::path::Path;

    fn config_with(listen: &[&str], routes: Vec<Route>) -> Config {
        let mut servers = std::collections::BTreeMap::new();
        servers.insert(
            "srv".to_string(),
            Server {
                listen: listen.iter().map(|s| s.to_string()).collect(),
                routes,
                ..Default::default()
            },
        );
        let mut config = Config::default();
        config.apps.http = Some(HttpApp {
            servers,
            ..Default::default()
        });
        config
    }

    fn host_route(host: &str, path: &[&str], dial: &str) -> Route {
        Route {
            matchers: vec![MatcherSet {
                host: vec![host.to_string()],
                path: path.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }],
            handle: vec![Handler::reverse_proxy(dial, false, false)],
            terminal: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert_eq!(validate(&Config::default()), Ok(()));
        assert_eq!(validate_value(&json!({})), Ok(()));
    }

    #[test]
    fn test_null_config() {
        assert_eq!(validate_value(&Value::Null), Err(ValidationError::NilConfig));
    }

    #[test]
    fn test_content_without_http_app() {
        let raw = json!({"storage": {"module": "file_system", "root": "/data"}});
        assert_eq!(validate_value(&raw), Err(ValidationError::MissingHttpApp));
    }

    #[test]
    fn test_compiled_output_is_valid() {
        let mut a = RoutingRecord::new("a.example.com, www.a.example.com", "a", 80);
        a.hsts_enabled = true;
        a.block_exploits = true;
        a.websocket_support = true;
        a.locations = vec![PathRule {
            path: "/api".to_string(),
            forward_scheme: "http".to_string(),
            forward_host: "api".to_string(),
            forward_port: 9000,
        }];
        let b = RoutingRecord::new("b.example.com", "fd00::2", 8443);

        let config = compile(&[a, b], Path::new("/data/caddy/data"), "ops@example.com").unwrap();
        assert_eq!(validate(&config), Ok(()));
    }

    #[test]
    fn test_duplicate_hosts() {
        let config = config_with(
            &[":80"],
            vec![
                host_route("test.com", &[], "app:8080"),
                host_route("test.com", &[], "app2:8080"),
            ],
        );
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate host"));
    }

    #[test]
    fn test_path_route_after_catch_all_is_rejected() {
        let config = config_with(
            &[":80"],
            vec![
                host_route("test.com", &[], "app:8080"),
                host_route("test.com", &["/api"], "api:8080"),
            ],
        );
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::ShadowedPath { route: 1, .. }));
        assert!(err.to_string().contains("duplicate host"));
    }

    #[test]
    fn test_repeated_path_scope_is_rejected() {
        let config = config_with(
            &[":80"],
            vec![
                host_route("test.com", &["/api"], "api:8080"),
                host_route("test.com", &["/api"], "api2:8080"),
            ],
        );
        assert!(matches!(
            validate(&config),
            Err(ValidationError::DuplicateHost { route: 1, .. })
        ));
    }

    #[test]
    fn test_no_listen_addresses() {
        let config = config_with(&[], vec![]);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("no listen addresses"));
    }

    #[test]
    fn test_listen_addresses() {
        for good in [":80", "0.0.0.0:443", "[::]:8443", "tcp/127.0.0.1:2019"] {
            assert_eq!(validate(&config_with(&[good], vec![])), Ok(()), "{good}");
        }

        let err = validate(&config_with(&[":99999"], vec![])).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let err = validate(&config_with(&[":0"], vec![])).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let err = validate(&config_with(&["example.com:80"], vec![])).unwrap_err();
        assert!(err.to_string().contains("invalid IP address"));

        let err = validate(&config_with(&["80"], vec![])).unwrap_err();
        assert!(err.to_string().contains("invalid address format"));
    }

    #[test]
    fn test_route_without_handlers() {
        let mut route = host_route("test.com", &[], "app:80");
        route.handle.clear();
        let err = validate(&config_with(&[":80"], vec![route])).unwrap_err();
        assert!(err.to_string().contains("no handlers"));
    }

    #[test]
    fn test_reverse_proxy_upstreams() {
        let mut route = host_route("test.com", &[], "app");
        let err = validate(&config_with(&[":80"], vec![route.clone()])).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidHandler {
                reason: HandlerError::InvalidDial { index: 0, .. },
                ..
            }
        ));

        route.handle = vec![Handler::from_map(
            json!({"handler": "reverse_proxy"}).as_object().unwrap().clone(),
        )];
        let err = validate(&config_with(&[":80"], vec![route])).unwrap_err();
        assert!(err.to_string().contains("no upstreams"));
    }

    #[test]
    fn test_unknown_handlers_are_accepted() {
        let mut route = host_route("test.com", &[], "app:80");
        route.handle = vec![Handler::from_map(
            json!({"handler": "static_response", "status_code": 200})
                .as_object()
                .unwrap()
                .clone(),
        )];
        assert_eq!(validate(&config_with(&[":80"], vec![route])), Ok(()));
    }

    #[test]
    fn test_handler_without_kind() {
        let mut route = host_route("test.com", &[], "app:80");
        route.handle = vec![Handler::Passthrough(serde_json::Map::new())];
        let err = validate(&config_with(&[":80"], vec![route])).unwrap_err();
        assert!(err.to_string().contains("missing 'handler' field"));
    }
}
