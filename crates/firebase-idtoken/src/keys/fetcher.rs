//! Transport seam for the key-publishing endpoint

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CACHE_CONTROL;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Raw response from the key-publishing endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
    /// `Cache-Control` header value, if the transport exposes one
    pub cache_control: Option<String>,
}

impl FetchResponse {
    /// A `200 OK` response with the given body and cache directive
    pub fn ok(body: impl Into<Bytes>, cache_control: Option<&str>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            cache_control: cache_control.map(str::to_owned),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete in time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Connection, TLS or body-read failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Fetches the issuer's key set
///
/// Implementations must honour `timeout`; the key cache additionally wraps
/// every call in its own timeout of the same length.
#[async_trait]
pub trait KeyFetcher: Send + Sync + Debug {
    /// GET `url` and return status, body and cache directive
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// [`KeyFetcher`] backed by a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Create a fetcher with its own connection pool
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Reuse an existing client (and its pool)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Transport(e.to_string())
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status().as_u16();
        let cache_control = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(map_err)?;

        debug!(url = %url, status, body_len = body.len(), "Key endpoint responded");

        Ok(FetchResponse {
            status,
            body,
            cache_control,
        })
    }
}
