//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::ValidationError;

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

/// Environment variables understood by [`apply_env_overrides`].
pub const ENV_ALLOWED_HOSTS: &str = "PROXY_ALLOWED_HOSTS";
pub const ENV_COOKIE_SECURE: &str = "COOKIE_SECURE";
pub const ENV_INSECURE_HTTPS: &str = "PROXY_INSECURE_HTTPS";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";

/// Parse a TOML file into a config without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so tests don't touch the process env.
/// Boolean flags are only enabled by the exact string `"true"`.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_ALLOWED_HOSTS) {
        config.proxy.allowed_hosts = split_hosts(&raw);
    }
    if let Some(raw) = lookup(ENV_COOKIE_SECURE) {
        config.proxy.cookie_secure = raw == "true";
    }
    if let Some(raw) = lookup(ENV_INSECURE_HTTPS) {
        config.upstream.insecure_tls = raw == "true";
    }

    let host = lookup(ENV_HOST).filter(|h| !h.is_empty());
    let port = lookup(ENV_PORT).filter(|p| !p.is_empty());
    if host.is_some() || port.is_some() {
        set_bind_address(config, host.as_deref(), port.as_deref());
    }
}

/// Replace host and/or port of the listener bind address.
pub fn set_bind_address(config: &mut ProxyConfig, host: Option<&str>, port: Option<&str>) {
    let current = config.listener.bind_address.clone();
    let (current_host, current_port) = current
        .rsplit_once(':')
        .unwrap_or((current.as_str(), "8080"));

    let host = host.unwrap_or(current_host);
    let port = port.unwrap_or(current_port);

    config.listener.bind_address = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
}

/// Split a comma-separated host list, trimming and lowercasing entries.
pub fn split_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}
