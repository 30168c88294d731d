//! Pipeline error taxonomy.
//!
//! Every failure in the forwarding pipeline surfaces to the client as a
//! non-2xx response with a short generic body. Details stay in the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while forwarding a request upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Configured upstream origin is not a usable http(s) URL.
    #[error("invalid upstream origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    /// Connection to the upstream could not be established.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Upstream did not answer within the configured deadline.
    #[error("upstream timed out after {0} seconds")]
    UpstreamTimeout(u64),

    /// Upstream answered with something that is not valid HTTP.
    #[error("upstream protocol error: {0}")]
    UpstreamProtocolError(String),

    /// Body could not be decoded for its declared content-encoding.
    #[error("failed to decode {encoding} body: {source}")]
    DecodeError {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Inbound request body was unreadable or too large.
    #[error("failed to read request body: {0}")]
    RequestBody(String),
}

/// Result type for pipeline operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    /// HTTP status presented to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidOrigin { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UpstreamUnreachable(_)
            | ProxyError::UpstreamProtocolError(_)
            | ProxyError::DecodeError { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Proxy request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Rejected request");
        }

        let message = match status {
            StatusCode::GATEWAY_TIMEOUT => "Upstream request timed out",
            StatusCode::BAD_GATEWAY => "Upstream request failed",
            StatusCode::BAD_REQUEST => "Invalid request body",
            _ => "Internal proxy error",
        };
        (status, message).into_response()
    }
}
