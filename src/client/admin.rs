//! Admin API client with a bounded timeout.
//!
//! # Responsibilities
//! - Replace the proxy's running configuration (`POST /load`)
//! - Fetch the running configuration (`GET /config/`)
//! - Liveness check against the read endpoint

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;

use crate::model::Config;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid admin URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to encode config: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("admin API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("admin API returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode config: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Thin wrapper over the proxy's administrative endpoint.
///
/// Never retries. Dropping a returned future aborts the request in flight.
#[derive(Debug, Clone)]
pub struct AdminClient {
    base_url: String,
    http: reqwest::Client,
}

impl AdminClient {
    /// Create a client for `base_url` (e.g. `http://localhost:2019`).
    ///
    /// # Arguments
    /// * `base_url` - Admin endpoint root; trailing slashes are ignored
    /// * `timeout` - Upper bound for every request
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let trimmed = base_url.trim_end_matches('/');
        let parsed: url::Url =
            trimmed
                .parse()
                .map_err(|e: url::ParseError| ClientError::InvalidUrl {
                    url: base_url.to_string(),
                    reason: e.to_string(),
                })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: trimmed.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the running configuration atomically.
    pub async fn load(&self, config: &Config) -> ClientResult<()> {
        let body = serde_json::to_vec(config).map_err(ClientError::Encode)?;

        let res = self
            .http
            .post(format!("{}/load", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        check_status(res).await?;
        tracing::debug!(admin = %self.base_url, "Configuration loaded");
        Ok(())
    }

    /// Fetch and decode the running configuration.
    ///
    /// A proxy with nothing loaded answers `null`; that decodes to an empty
    /// document.
    pub async fn get_config(&self) -> ClientResult<Config> {
        let res = self.get_config_raw().await?;
        let bytes = res.bytes().await?;

        let body = bytes.trim_ascii();
        if body.is_empty() || body == b"null" {
            return Ok(Config::default());
        }
        serde_json::from_slice(body).map_err(ClientError::Decode)
    }

    /// Liveness check; the body is ignored.
    pub async fn ping(&self) -> ClientResult<()> {
        self.get_config_raw().await.map(|_| ())
    }

    async fn get_config_raw(&self) -> ClientResult<reqwest::Response> {
        let res = self
            .http
            .get(format!("{}/config/", self.base_url))
            .send()
            .await?;
        check_status(res).await
    }
}

async fn check_status(res: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = AdminClient::new("http://localhost:2019/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://localhost:2019");
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(
            AdminClient::new("not a url", DEFAULT_TIMEOUT),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            AdminClient::new("ftp://localhost:2019", DEFAULT_TIMEOUT),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_status_error_carries_body() {
        let err = ClientError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "loading config: bad handler".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("bad handler"));
    }

    #[tokio::test]
    async fn test_unreachable_admin_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = AdminClient::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        assert!(matches!(client.ping().await, Err(ClientError::Transport(_))));
    }

    /// Answer every connection with `body` as a 200 response.
    async fn serve_body(body: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_non_utf8_config_is_decode_error() {
        let url = serve_body(b"{\"note\": \"caf\xe9\"}").await;
        let client = AdminClient::new(&url, Duration::from_secs(2)).unwrap();
        assert!(matches!(client.get_config().await, Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_padded_null_config_is_empty() {
        let url = serve_body(b"  null\n").await;
        let client = AdminClient::new(&url, Duration::from_secs(2)).unwrap();
        assert_eq!(client.get_config().await.unwrap(), Config::default());
    }
}
