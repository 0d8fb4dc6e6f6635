//! Import types and errors.

use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A host candidate recovered from a legacy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParsedHost {
    pub domain_names: String,
    pub forward_scheme: String,

    /// Empty when no upstream could be extracted.
    pub forward_host: String,

    /// Zero when no upstream port could be extracted.
    pub forward_port: u16,

    pub ssl_forced: bool,
    pub websocket_support: bool,

    /// The source route as `{"server", "route", "data"}` JSON, for review.
    pub raw_json: String,

    /// Unsupported directives found on the route.
    pub warnings: Vec<String>,
}

impl ParsedHost {
    /// True if the candidate names a target and can become a record.
    pub fn is_actionable(&self) -> bool {
        !self.forward_host.is_empty() && self.forward_port != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImportResult {
    pub hosts: Vec<ParsedHost>,
    pub conflicts: Vec<String>,
    pub errors: Vec<String>,
}

/// Caller's decision for a conflicting domain at commit time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Import,
    Skip,
    /// Import under `<domain>-imported`.
    Rename,
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "import" | "merge" => Ok(Resolution::Import),
            "skip" => Ok(Resolution::Skip),
            "rename" => Ok(Resolution::Rename),
            other => Err(format!("unknown resolution '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("source file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to run adapter {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("adapter failed: {0}")]
    Adapter(String),

    #[error("adapter binary {0} not found or not executable")]
    Unavailable(String),

    #[error("parsing adapted config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parsing() {
        assert_eq!("skip".parse::<Resolution>(), Ok(Resolution::Skip));
        assert_eq!("Rename".parse::<Resolution>(), Ok(Resolution::Rename));
        assert_eq!("merge".parse::<Resolution>(), Ok(Resolution::Import));
        assert!("drop".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_actionable() {
        let mut host = ParsedHost {
            domain_names: "a.example.com".to_string(),
            forward_host: "a".to_string(),
            ..Default::default()
        };
        assert!(!host.is_actionable());
        host.forward_port = 80;
        assert!(host.is_actionable());
    }
}
