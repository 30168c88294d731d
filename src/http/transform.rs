//! Inbound → upstream request transformation.
//!
//! # Pipeline (fixed order)
//! ```text
//! InboundRequest
//!     → copy method, headers, body
//!     → strip route prefix
//!     → resolve origin, set scheme + host
//!     → inject query params from request headers
//!     → delete skipped query params
//!     → append forced uip / ua
//!     → UpstreamRequest
//! ```
//!
//! The forced `uip`/`ua` values are appended last so they are always the
//! final occurrence of those keys, whatever was injected or sent.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::config::ProxyConfig;
use crate::http::request::InboundRequest;
use crate::routing::OriginResolver;

/// Separator between source header and target param in an injection rule.
const RULE_RENAME_SEPARATOR: &str = "__";

/// Encodings the response decoder understands.
const SUPPORTED_ENCODINGS: &str = "gzip, deflate, br";

/// Header → query parameter mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectRule {
    pub header: String,
    pub param: String,
}

impl InjectRule {
    /// `name` maps a header onto a param of the same name; `header__param`
    /// renames it. Anything after a second `__` is ignored.
    pub fn parse(rule: &str) -> Self {
        if rule.contains(RULE_RENAME_SEPARATOR) {
            let mut parts = rule.split(RULE_RENAME_SEPARATOR);
            let header = parts.next().unwrap_or_default();
            let param = parts.next().unwrap_or_default();
            Self {
                header: header.to_string(),
                param: param.to_string(),
            }
        } else {
            Self {
                header: rule.to_string(),
                param: rule.to_string(),
            }
        }
    }
}

/// Parse a comma-separated rule list, skipping empty entries.
pub fn parse_inject_rules(raw: &str) -> Vec<InjectRule> {
    split_list(raw).map(InjectRule::parse).collect()
}

/// Parse a comma-separated parameter list, skipping empty entries.
pub fn parse_skip_params(raw: &str) -> Vec<String> {
    split_list(raw).map(str::to_string).collect()
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').filter(|entry| !entry.is_empty())
}

/// A request ready to be sent upstream. Lives for a single forward.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Compiled request rewriting rules.
#[derive(Debug, Clone)]
pub struct RequestTransformer {
    route_prefix: String,
    inject: Vec<InjectRule>,
    skip: Vec<String>,
}

impl RequestTransformer {
    pub fn new(route_prefix: impl Into<String>, inject: Vec<InjectRule>, skip: Vec<String>) -> Self {
        Self {
            route_prefix: route_prefix.into(),
            inject,
            skip,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.route_prefix.clone(),
            parse_inject_rules(&config.inject_params_from_req_headers),
            parse_skip_params(&config.skip_params_from_req_headers),
        )
    }

    pub fn inject_rules(&self) -> &[InjectRule] {
        &self.inject
    }

    /// Remove the route prefix when the target is strictly below it.
    ///
    /// `/p/collect?x=1` → `/collect?x=1`; `/p` and `/px/collect` are kept.
    pub fn strip_prefix<'a>(&self, path_and_query: &'a str) -> &'a str {
        if self.route_prefix.is_empty() {
            return path_and_query;
        }
        match path_and_query.strip_prefix(self.route_prefix.as_str()) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => path_and_query,
        }
    }

    /// Build the upstream copy of `inbound`.
    pub fn transform(&self, inbound: &InboundRequest, resolver: &OriginResolver) -> UpstreamRequest {
        let target = self.strip_prefix(inbound.path_and_query());
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        let origin = resolver.resolve(path);
        let mut url = origin.base_url();
        url.set_path(path);
        url.set_query(query);

        self.rewrite_query(&mut url, inbound);

        UpstreamRequest {
            method: inbound.method.clone(),
            url,
            headers: upstream_headers(&inbound.headers),
            body: inbound.body.clone(),
        }
    }

    fn rewrite_query(&self, url: &mut Url, inbound: &InboundRequest) {
        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        for rule in &self.inject {
            let value = inbound.header(&rule.header);
            tracing::debug!(param = %rule.param, value = %value, "Added param to query string");
            pairs.push((rule.param.clone(), value));
        }

        for name in &self.skip {
            pairs.retain(|(key, _)| key != name);
            tracing::debug!(param = %name, "Removed param from query string");
        }

        pairs.push(("uip".to_string(), inbound.client_ip()));
        pairs.push(("ua".to_string(), inbound.user_agent()));

        url.query_pairs_mut().clear().extend_pairs(&pairs);
    }
}

/// Headers that describe the inbound connection rather than the request.
fn is_connection_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "transfer-encoding"
            | "te"
            | "trailer"
            | "upgrade"
            | "host"
            | "content-length"
    )
}

/// Copy request headers for the upstream, minus connection-level ones.
fn upstream_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_connection_header(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if headers.contains_key(header::ACCEPT_ENCODING) {
        headers.insert(
            header::ACCEPT_ENCODING,
            HeaderValue::from_static(SUPPORTED_ENCODINGS),
        );
    }
    headers
}
