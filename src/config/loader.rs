//! Configuration loading.
//!
//! Precedence, lowest first: built-in defaults, optional TOML file,
//! environment variables / command-line flags.

use std::fs;
use std::path::Path;

use clap::Args;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Settings that can be supplied through the environment or CLI flags.
///
/// Every field is optional; only values actually present override the file
/// or the defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Path prefix the relay is mounted under.
    #[arg(long, env = "ROUTE_PREFIX")]
    pub route_prefix: Option<String>,

    /// Default upstream origin.
    #[arg(long, env = "GOOGLE_ORIGIN")]
    pub google_origin: Option<String>,

    /// Header→query rules, e.g. "x-email__uip,user-agent__ua".
    #[arg(long, env = "INJECT_PARAMS_FROM_REQ_HEADERS")]
    pub inject_params_from_req_headers: Option<String>,

    /// Query parameters removed before forwarding, e.g. "foo,bar".
    #[arg(long, env = "SKIP_PARAMS_FROM_REQ_HEADERS")]
    pub skip_params_from_req_headers: Option<String>,

    /// Bind host.
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Listen port.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Upstream call timeout in seconds.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Prometheus metrics listener address, e.g. "0.0.0.0:9090".
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,
}

impl ConfigOverrides {
    /// Apply every present override onto `config`.
    pub fn apply(self, config: &mut ProxyConfig) {
        if let Some(v) = self.route_prefix {
            config.route_prefix = v;
        }
        if let Some(v) = self.google_origin {
            config.google_origin = v;
        }
        if let Some(v) = self.inject_params_from_req_headers {
            config.inject_params_from_req_headers = v;
        }
        if let Some(v) = self.skip_params_from_req_headers {
            config.skip_params_from_req_headers = v;
        }
        if let Some(v) = self.host {
            config.host = v;
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.upstream_timeout_secs {
            config.timeouts.upstream_secs = v;
        }
        if let Some(v) = self.log_level {
            config.observability.log_level = v;
        }
        if let Some(v) = self.metrics_address {
            config.observability.metrics_address = Some(v);
        }
    }
}

/// Parse a TOML file without validating it.
pub fn read_config_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Resolve the effective configuration: defaults, then the optional file,
/// then overrides. Validation runs once on the merged result.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ProxyConfig::default(),
    };
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_toml(
            r#"
route_prefix = "/analytics"
inject_params_from_req_headers = "x-email__uip"

[timeouts]
upstream_secs = 10
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.route_prefix, "/analytics");
        assert_eq!(config.inject_params_from_req_headers, "x-email__uip");
        assert_eq!(config.timeouts.upstream_secs, 10);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.google_origin, "https://www.google-analytics.com");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn overrides_win_over_file() {
        let file = write_toml("port = 8080\nroute_prefix = \"/a\"\n");
        let overrides = ConfigOverrides {
            port: Some(9000),
            google_origin: Some("https://www.googletagmanager.com".into()),
            ..Default::default()
        };

        let config = resolve_config(Some(file.path()), overrides).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.route_prefix, "/a");
        assert_eq!(config.google_origin, "https://www.googletagmanager.com");
    }

    #[test]
    fn invalid_merged_config_fails_fast() {
        let overrides = ConfigOverrides {
            google_origin: Some("::not-an-origin".into()),
            ..Default::default()
        };
        match resolve_config(None, overrides) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn unroutable_prefix_and_bad_metrics_address_fail_before_startup() {
        let overrides = ConfigOverrides {
            route_prefix: Some("/:a".into()),
            metrics_address: Some("metrics.internal".into()),
            ..Default::default()
        };
        match resolve_config(None, overrides) {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.contains(&ValidationError::ReservedPrefixChars("/:a".into())));
                assert!(errors.contains(&ValidationError::InvalidMetricsAddress(
                    "metrics.internal".into()
                )));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let file = write_toml("port = \"not a number\"");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }
}
