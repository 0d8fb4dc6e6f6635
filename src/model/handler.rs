//! Route handlers.
//!
//! On the wire a handler is a free-form object keyed by `"handler"`. The
//! proxy is extensible, so only the kinds this crate produces or inspects are
//! typed; everything else is carried verbatim in [`Handler::Passthrough`].

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const KIND_FIELD: &str = "handler";
pub const REVERSE_PROXY: &str = "reverse_proxy";
pub const HEADERS: &str = "headers";
pub const VARS: &str = "vars";
pub const SUBROUTE: &str = "subroute";
pub const REWRITE: &str = "rewrite";
pub const FILE_SERVER: &str = "file_server";

/// Marker variable set by the exploit-block handler.
const BLOCK_EXPLOITS_VAR: &str = "block_exploits";

/// A handler in a route's chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
    /// `headers`: request/response header manipulation.
    Headers(HeaderRules),

    /// Exploit blocking, encoded as `{"handler": "vars", "block_exploits": true}`.
    BlockExploits,

    /// `reverse_proxy` to one or more upstreams.
    ReverseProxy(ReverseProxyHandler),

    /// Any other handler, or a known kind whose fields did not decode.
    Passthrough(Map<String, Value>),
}

/// Header operations for requests and/or responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<HeaderOps>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<HeaderOps>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderOps {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReverseProxyHandler {
    pub upstreams: Vec<Upstream>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderRules>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReverseProxyHandler {
    /// True if the request `Upgrade` header is passed through to upstreams.
    pub fn passes_upgrade(&self) -> bool {
        self.headers
            .as_ref()
            .and_then(|h| h.request.as_ref())
            .map(|ops| ops.set.contains_key("Upgrade"))
            .unwrap_or(false)
    }

    /// True if the transport dials upstreams over TLS.
    pub fn uses_tls(&self) -> bool {
        self.transport
            .as_ref()
            .and_then(|t| t.get("tls"))
            .is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Upstream {
    pub dial: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Handler {
    /// Reverse proxy to a single upstream.
    ///
    /// `websocket` passes the client's `Upgrade`/`Connection` headers through;
    /// `tls` makes the proxy dial the upstream over HTTPS.
    pub fn reverse_proxy(dial: impl Into<String>, websocket: bool, tls: bool) -> Self {
        let headers = websocket.then(|| {
            let mut set = BTreeMap::new();
            set.insert(
                "Upgrade".to_string(),
                vec!["{http.request.header.Upgrade}".to_string()],
            );
            set.insert(
                "Connection".to_string(),
                vec!["{http.request.header.Connection}".to_string()],
            );
            HeaderRules {
                request: Some(HeaderOps {
                    set,
                    ..Default::default()
                }),
                ..Default::default()
            }
        });

        Handler::ReverseProxy(ReverseProxyHandler {
            upstreams: vec![Upstream {
                dial: dial.into(),
                ..Default::default()
            }],
            headers,
            transport: tls.then(|| json!({"protocol": "http", "tls": {}})),
            ..Default::default()
        })
    }

    /// Set a single response header.
    pub fn response_header(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut set = BTreeMap::new();
        set.insert(name.into(), vec![value.into()]);
        Handler::Headers(HeaderRules {
            response: Some(HeaderOps {
                set,
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// The wire `handler` name, if known.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Handler::Headers(_) => Some(HEADERS),
            Handler::BlockExploits => Some(VARS),
            Handler::ReverseProxy(_) => Some(REVERSE_PROXY),
            Handler::Passthrough(map) => map.get(KIND_FIELD).and_then(Value::as_str),
        }
    }

    /// Encode as the wire object.
    pub fn to_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let (kind, body) = match self {
            Handler::Headers(rules) => (HEADERS, serde_json::to_value(rules)?),
            Handler::ReverseProxy(proxy) => (REVERSE_PROXY, serde_json::to_value(proxy)?),
            Handler::BlockExploits => {
                let mut fields = Map::new();
                fields.insert(BLOCK_EXPLOITS_VAR.to_string(), Value::Bool(true));
                (VARS, Value::Object(fields))
            }
            Handler::Passthrough(map) => return Ok(map.clone()),
        };

        let mut map = Map::new();
        map.insert(KIND_FIELD.to_string(), Value::String(kind.to_string()));
        if let Value::Object(fields) = body {
            map.extend(fields);
        }
        Ok(map)
    }

    /// Decode from the wire object. Never fails: fields that do not fit a
    /// known kind leave the handler as passthrough.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let kind = map
            .get(KIND_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match kind.as_str() {
            REVERSE_PROXY => decode_fields(&map)
                .map(Handler::ReverseProxy)
                .unwrap_or(Handler::Passthrough(map)),
            HEADERS => decode_fields(&map)
                .map(Handler::Headers)
                .unwrap_or(Handler::Passthrough(map)),
            VARS if map.len() == 2 && map.get(BLOCK_EXPLOITS_VAR) == Some(&Value::Bool(true)) => {
                Handler::BlockExploits
            }
            _ => Handler::Passthrough(map),
        }
    }
}

fn decode_fields<T: de::DeserializeOwned>(map: &Map<String, Value>) -> Option<T> {
    let mut fields = map.clone();
    fields.remove(KIND_FIELD);
    serde_json::from_value(Value::Object(fields)).ok()
}

impl Serialize for Handler {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map()
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Handler {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Handler::from_map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_proxy_wire_shape() {
        let handler = Handler::reverse_proxy("media:32400", true, false);
        let value = serde_json::to_value(&handler).unwrap();
        assert_eq!(value["handler"], "reverse_proxy");
        assert_eq!(value["upstreams"][0]["dial"], "media:32400");
        assert_eq!(
            value["headers"]["request"]["set"]["Upgrade"][0],
            "{http.request.header.Upgrade}"
        );
        assert!(value.get("transport").is_none());

        let decoded: Handler = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, handler);
    }

    #[test]
    fn test_tls_transport() {
        let Handler::ReverseProxy(proxy) = Handler::reverse_proxy("nas:5001", false, true) else {
            panic!("expected reverse proxy");
        };
        assert!(proxy.uses_tls());
        assert!(!proxy.passes_upgrade());
    }

    #[test]
    fn test_block_exploits_is_distinct_from_plain_vars() {
        let block: Handler =
            serde_json::from_value(json!({"handler": "vars", "block_exploits": true})).unwrap();
        assert_eq!(block, Handler::BlockExploits);

        let vars: Handler =
            serde_json::from_value(json!({"handler": "vars", "root": "/srv"})).unwrap();
        assert!(matches!(vars, Handler::Passthrough(_)));
        assert_eq!(vars.kind(), Some("vars"));
    }

    #[test]
    fn test_unknown_handler_passes_through() {
        let raw = json!({
            "handler": "encode",
            "encodings": {"gzip": {}},
            "prefer": ["gzip"]
        });
        let handler: Handler = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(handler.kind(), Some("encode"));
        assert_eq!(serde_json::to_value(&handler).unwrap(), raw);
    }

    #[test]
    fn test_reverse_proxy_extra_fields_kept() {
        let raw = json!({
            "handler": "reverse_proxy",
            "upstreams": [{"dial": "app:8080", "max_requests": 10}],
            "load_balancing": {"selection_policy": {"policy": "first"}}
        });
        let handler: Handler = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(handler, Handler::ReverseProxy(_)));
        assert_eq!(serde_json::to_value(&handler).unwrap(), raw);
    }

    #[test]
    fn test_malformed_reverse_proxy_is_passthrough() {
        let handler: Handler =
            serde_json::from_value(json!({"handler": "reverse_proxy", "upstreams": "app:80"}))
                .unwrap();
        assert!(matches!(handler, Handler::Passthrough(_)));
        assert_eq!(handler.kind(), Some("reverse_proxy"));
    }
}
