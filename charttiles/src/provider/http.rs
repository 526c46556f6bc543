//! HTTP client abstraction for remote tile origins.
//!
//! The trait allows dependency injection so the cache and job engine can
//! run against a mock client in tests; the production implementation is
//! a pooled reqwest client with a short per-request timeout.

use std::fmt;
use std::future::Future;
use tracing::{trace, warn};

/// Default timeout for a single tile fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Errors that can occur while talking to a remote tile origin.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP request failed (connect, timeout, non-success status)
    HttpError(String),
    /// The response carried no body
    EmptyResponse,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::EmptyResponse => write!(f, "empty response body"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Trait for async tile HTTP clients.
///
/// Implementors perform a GET with per-source headers and return the
/// body bytes, or an error for any non-success outcome.
pub trait TileHttpClient: Send + Sync {
    fn get_with_headers(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

/// Production HTTP client backed by reqwest.
///
/// Keeps a warm connection pool so seeding worker pools do not pay a
/// handshake per tile.
#[derive(Clone)]
pub struct ReqwestTileClient {
    client: reqwest::Client,
}

impl ReqwestTileClient {
    /// Creates a client with the default 5 second tile timeout.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT_SECS)
    }

    /// Creates a client with a custom per-request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(64)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ProviderError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl TileHttpClient for ReqwestTileClient {
    async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Vec<u8>, ProviderError> {
        trace!(url, "tile GET starting");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "tile request failed"
                );
                return Err(ProviderError::HttpError(format!("Request failed: {}", e)));
            }
        };

        if !response.status().is_success() {
            warn!(url, status = response.status().as_u16(), "HTTP error status");
            return Err(ProviderError::HttpError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::HttpError(format!("Failed to read response: {}", e)))?;

        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        trace!(url, bytes = bytes.len(), "tile response body read");
        Ok(bytes.to_vec())
    }
}
