//! Pooled upstream HTTP client.
//!
//! # Responsibilities
//! - Send transformed requests to the resolved origin over HTTP or HTTPS
//! - Reuse connections per origin across concurrent handlers
//! - Enforce connect and total deadlines
//! - Classify failures (unreachable / timeout / protocol)
//!
//! # Design Decisions
//! - One client per server, injected through handler state
//! - No retries: a failed call fails the client request
//! - No redirect following and no transparent decompression; the caller
//!   sees exactly what the upstream sent

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::config::TimeoutConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::http::transform::UpstreamRequest;

/// A fully read upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Raw body, still content-encoded.
    pub body: Bytes,
}

/// Shared upstream client. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    inner: reqwest::Client,
    timeout_secs: u64,
}

impl UpstreamClient {
    /// Build the pooled client from timeout settings.
    pub fn new(timeouts: &TimeoutConfig) -> ProxyResult<Self> {
        let inner = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .no_proxy()
            .build()
            .map_err(|e| ProxyError::UpstreamProtocolError(format!("client setup failed: {e}")))?;

        Ok(Self {
            inner,
            timeout_secs: timeouts.upstream_secs,
        })
    }

    /// Send a request and read the whole response body.
    pub async fn send(&self, request: UpstreamRequest) -> ProxyResult<UpstreamResponse> {
        let response = self
            .inner
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }

    fn classify(&self, error: reqwest::Error) -> ProxyError {
        if error.is_timeout() {
            ProxyError::UpstreamTimeout(self.timeout_secs)
        } else if error.is_connect() {
            ProxyError::UpstreamUnreachable(error.to_string())
        } else {
            ProxyError::UpstreamProtocolError(error.to_string())
        }
    }
}
