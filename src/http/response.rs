//! Client response assembly.
//!
//! # Responsibilities
//! - Write the (possibly rewritten) body
//! - Copy the upstream status code and original content-type
//! - Tag the response with `x-proxy-by: gaxy`
//!
//! # Design Decisions
//! - Every other upstream header (cache directives, cookies, encodings) is
//!   dropped on purpose; the body has already been decoded, so forwarding
//!   `content-encoding` or `content-length` would be wrong anyway
//! - Content-type is the upstream's, never re-detected after rewriting

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

/// Provenance header added to every forwarded response.
pub const X_PROXY_BY: HeaderName = HeaderName::from_static("x-proxy-by");

/// Value of [`X_PROXY_BY`].
pub const PROXY_NAME: &str = "gaxy";

/// Upstream content-type as text; "" when absent or not visible ASCII.
pub fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Build the client-facing response.
pub fn assemble(status: StatusCode, content_type: Option<&HeaderValue>, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    headers.insert(X_PROXY_BY, HeaderValue::from_static(PROXY_NAME));
    response
}
