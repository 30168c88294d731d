//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for correlation
//! - Buffer the inbound request into an immutable [`InboundRequest`]
//! - Extract the client IP and the proxy's externally visible host
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Original request preserved; the upstream gets a modified copy

use std::net::{IpAddr, SocketAddr};

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::{ProxyError, ProxyResult};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header a fronting load balancer uses to pass the public host.
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of a request, or "unknown" when the layer did not run.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The client's request, fully buffered. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Peer address of the TCP connection, when the server recorded it.
    pub client_ip: Option<IpAddr>,
}

impl InboundRequest {
    /// Buffer an axum request, reading at most `max_body_size` bytes of body.
    pub async fn from_request(request: Request<Body>, max_body_size: usize) -> ProxyResult<Self> {
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(|e| ProxyError::RequestBody(e.to_string()))?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            client_ip,
        })
    }

    /// Header value as text; missing headers read as "".
    pub fn header(&self, name: &str) -> String {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default()
    }

    pub fn user_agent(&self) -> String {
        self.header(header::USER_AGENT.as_str())
    }

    /// Client IP as text; "" when unknown.
    pub fn client_ip(&self) -> String {
        self.client_ip.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// Path and query exactly as received, e.g. `/p/collect?x=1`.
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    /// Host the client used to reach the proxy.
    ///
    /// A non-empty `X-Forwarded-Host` wins; otherwise the authority of the
    /// request target, falling back to the `Host` header for origin-form
    /// request lines.
    pub fn public_host(&self) -> String {
        let forwarded = self.header(X_FORWARDED_HOST.as_str());
        if !forwarded.is_empty() {
            return forwarded;
        }

        if let Some(authority) = self.uri.authority() {
            return match authority.port_u16() {
                Some(port) => format!("{}:{}", authority.host(), port),
                None => authority.host().to_string(),
            };
        }

        self.header(header::HOST.as_str())
    }
}
