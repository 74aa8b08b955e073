//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and file paths
//! - Reject allow-list entries that are not bare hostnames
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.tls.{0} is empty")]
    TlsPath(&'static str),

    #[error("proxy.allowed_hosts entry {0:?} must be a bare hostname without port")]
    AllowedHost(String),

    #[error("static_files.dir {0:?} is not a directory")]
    StaticDir(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("upstream.pool_idle_timeout_secs must be greater than 0")]
    PoolIdleTimeout,
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("key_path"));
        }
    }

    for host in &config.proxy.allowed_hosts {
        if !is_bare_hostname(host) {
            errors.push(ValidationError::AllowedHost(host.clone()));
        }
    }

    if let Some(dir) = &config.static_files.dir {
        if !Path::new(dir).is_dir() {
            errors.push(ValidationError::StaticDir(dir.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.upstream.pool_idle_timeout_secs == 0 {
        errors.push(ValidationError::PoolIdleTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Allow-list entries are compared against host names without ports, so an
/// entry carrying `:port` could never match. Bracketed IPv6 literals keep
/// their colons.
fn is_bare_hostname(host: &str) -> bool {
    let host = host.trim();
    let is_ipv6_literal = host.starts_with('[') && host.ends_with(']');
    !host.is_empty()
        && !host.contains("://")
        && !host.contains('/')
        && (is_ipv6_literal || !host.contains(':'))
        && !host.chars().any(char::is_whitespace)
}
