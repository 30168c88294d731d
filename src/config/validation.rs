//! Configuration validation.
//!
//! Semantic checks on a deserialized [`ProxyConfig`]. All failures are
//! collected so a misconfigured deployment reports everything at once.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("google_origin '{origin}' is invalid: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("route_prefix '{0}' must start with '/' and must not end with '/'")]
    MalformedPrefix(String),

    #[error("route_prefix '{0}' contains reserved characters ('{{', '}}', '*' or a segment starting with ':')")]
    ReservedPrefixChars(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request_secs}) must be greater than timeouts.upstream_secs ({upstream_secs})")]
    RequestTimeoutTooShort { request_secs: u64, upstream_secs: u64 },

    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(reason) = check_origin(&config.google_origin) {
        errors.push(ValidationError::InvalidOrigin {
            origin: config.google_origin.clone(),
            reason,
        });
    }

    let prefix = &config.route_prefix;
    if !prefix.is_empty() {
        if !prefix.starts_with('/') || prefix.ends_with('/') {
            errors.push(ValidationError::MalformedPrefix(prefix.clone()));
        }
        if has_reserved_chars(prefix) {
            errors.push(ValidationError::ReservedPrefixChars(prefix.clone()));
        }
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if timeouts.upstream_secs > 0 && timeouts.request_secs <= timeouts.upstream_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: timeouts.request_secs,
            upstream_secs: timeouts.upstream_secs,
        });
    }

    let limits = &config.limits;
    for (name, value) in [
        ("max_body_size", limits.max_body_size),
        ("max_decoded_size", limits.max_decoded_size),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroLimit(name));
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Characters the router treats as path parameters or wildcards.
fn has_reserved_chars(prefix: &str) -> bool {
    prefix.contains(&['{', '}', '*'][..])
        || prefix.split('/').any(|segment| segment.starts_with(':'))
}

/// An origin must be an absolute http(s) URL with a host.
pub(crate) fn check_origin(origin: &str) -> Result<Url, String> {
    let url = Url::parse(origin).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}
