//! `host:port` helpers shared by the compiler, validator and importer.

use thiserror::Error;

/// Errors produced when splitting a `host:port` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("missing port in address '{0}'")]
    MissingPort(String),

    #[error("missing ']' in address '{0}'")]
    MissingBracket(String),

    #[error("too many colons in address '{0}'")]
    TooManyColons(String),
}

/// Split `host:port`, `[v6]:port` or `:port` into host and port.
///
/// The host may be empty (wildcard). The port is returned unparsed; callers
/// decide how strict to be about it.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), AddressError> {
    if let Some(rest) = addr.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| AddressError::MissingBracket(addr.to_string()))?;
        let port = rest[end + 1..]
            .strip_prefix(':')
            .ok_or_else(|| AddressError::MissingPort(addr.to_string()))?;
        return Ok((&rest[..end], port));
    }

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| AddressError::MissingPort(addr.to_string()))?;
    if host.contains(':') {
        return Err(AddressError::TooManyColons(addr.to_string()));
    }
    Ok((host, port))
}

/// Join a host and port into a dial address, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("media:32400").unwrap(), ("media", "32400"));
        assert_eq!(split_host_port(":443").unwrap(), ("", "443"));
        assert_eq!(split_host_port("[::1]:8080").unwrap(), ("::1", "8080"));
    }

    #[test]
    fn test_split_host_port_errors() {
        assert!(matches!(
            split_host_port("media"),
            Err(AddressError::MissingPort(_))
        ));
        assert!(matches!(
            split_host_port("::1:80"),
            Err(AddressError::TooManyColons(_))
        ));
        assert!(matches!(
            split_host_port("[::1:80"),
            Err(AddressError::MissingBracket(_))
        ));
        assert!(matches!(
            split_host_port("[::1]"),
            Err(AddressError::MissingPort(_))
        ));
    }

    #[test]
    fn test_join_host_port_brackets_ipv6() {
        assert_eq!(join_host_port("10.0.0.5", 80), "10.0.0.5:80");
        assert_eq!(join_host_port("fd00::5", 80), "[fd00::5]:80");
        let dial = join_host_port("fd00::5", 80);
        assert_eq!(split_host_port(&dial).unwrap(), ("fd00::5", "80"));
    }
}
