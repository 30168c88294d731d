//! Configuration schema definitions.
//!
//! All types derive `Deserialize` with `#[serde(default)]` so a TOML file can supply any subset of
//! fields; everything else falls back to defaults.

use std::net::SocketAddr;

use serde::Deserialize;

/// Origin used when no `google_origin` is configured.
pub const DEFAULT_GOOGLE_ORIGIN: &str = "https://www.google-analytics.com";

/// Root configuration for the analytics relay.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Path prefix the relay is mounted under (e.g. "/analytics"). Empty = root.
    pub route_prefix: String,

    /// Default upstream origin (scheme + host).
    pub google_origin: String,

    /// Comma-separated header→query rules: `header` or `header__param`.
    pub inject_params_from_req_headers: String,

    /// Comma-separated query parameter names removed before forwarding.
    pub skip_params_from_req_headers: String,

    /// Bind host.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            route_prefix: String::new(),
            google_origin: DEFAULT_GOOGLE_ORIGIN.to_string(),
            inject_params_from_req_headers: String::new(),
            skip_params_from_req_headers: String::new(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Address the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total upstream call timeout (send + read body) in seconds.
    pub upstream_secs: u64,

    /// Whole-request deadline enforced by the server in seconds.
    pub request_secs: u64,

    /// Idle pooled connection lifetime in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
            idle_secs: 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum buffered inbound body size in bytes.
    pub max_body_size: usize,

    /// Maximum size of an upstream body after content decoding, in bytes.
    pub max_decoded_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024,      // 2MB
            max_decoded_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Prometheus endpoint bind address. Metrics are disabled when unset.
    pub metrics_address: Option<String>,
}

impl ObservabilityConfig {
    /// The metrics listener address, if configured and well-formed.
    pub fn metrics_socket_addr(&self) -> Option<SocketAddr> {
        self.metrics_address.as_deref().and_then(|addr| addr.parse().ok())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
