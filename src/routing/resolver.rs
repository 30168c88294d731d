//! Upstream origin selection.
//!
//! # Design Decisions
//! - Not a routing table: exactly one hard-coded special case
//!   (`/g/collect` → GA collection endpoint), everything else goes to the
//!   configured default origin
//! - The default origin is parsed once at startup so a bad value fails fast
//! - Matching is on the path after route-prefix stripping, case-sensitive

use std::fmt;

use url::Url;

use crate::config::validation::check_origin;
use crate::error::{ProxyError, ProxyResult};

/// Path prefix of GA4 collection hits.
pub const GA_COLLECT_PATH: &str = "/g/collect";

/// Origin that must receive GA4 collection hits.
pub const GA_COLLECT_ORIGIN: &str = "https://www.google-analytics.com";

/// A scheme + host (+ optional port) pair identifying an upstream server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    base: Url,
}

impl Origin {
    /// Parse an origin, rejecting anything that is not an http(s) URL with a host.
    /// Any path, query or fragment on the input is discarded.
    pub fn parse(origin: &str) -> ProxyResult<Self> {
        let mut base = check_origin(origin).map_err(|reason| ProxyError::InvalidOrigin {
            origin: origin.to_string(),
            reason,
        })?;
        base.set_path("/");
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    pub fn scheme(&self) -> &str {
        self.base.scheme()
    }

    /// Host with the port when one is explicit, e.g. `127.0.0.1:8080`.
    pub fn authority(&self) -> String {
        match (self.base.host_str(), self.base.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        }
    }

    /// A URL on this origin rooted at `/`, ready to be extended.
    pub fn base_url(&self) -> Url {
        self.base.clone()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme(), self.authority())
    }
}

/// Chooses the upstream origin for a request path.
#[derive(Debug, Clone)]
pub struct OriginResolver {
    collect: Origin,
    default: Origin,
}

impl OriginResolver {
    /// Build a resolver with `google_origin` as the default target.
    pub fn new(google_origin: &str) -> ProxyResult<Self> {
        Self::with_collect_origin(GA_COLLECT_ORIGIN, google_origin)
    }

    /// Build a resolver that sends collection hits to `collect_origin`.
    pub fn with_collect_origin(collect_origin: &str, google_origin: &str) -> ProxyResult<Self> {
        Ok(Self {
            collect: Origin::parse(collect_origin)?,
            default: Origin::parse(google_origin)?,
        })
    }

    /// Resolve the origin for a prefix-stripped request path.
    pub fn resolve(&self, path: &str) -> &Origin {
        if path.starts_with(GA_COLLECT_PATH) {
            &self.collect
        } else {
            &self.default
        }
    }

    pub fn default_origin(&self) -> &Origin {
        &self.default
    }
}
