//! `Location` rewriting for upstream redirects.
//!
//! # Responsibilities
//! - Decide whether a 3xx `Location` must be routed back through the proxy
//! - Resolve it against the upstream URL that produced it
//! - Re-apply the host allow-list to the resolved target
//!
//! # Design Decisions
//! - 307/308 are always rewritten: the browser would otherwise replay the
//!   method and body against a foreign origin without the caller's headers
//! - Other 3xx codes only rewrite relative locations; absolute ones pass through
//! - A location already under `/api/proxy/` is never wrapped again
//! - A disallowed or non-http(s) target leaves the header untouched

use axum::http::StatusCode;
use url::Url;

use crate::proxy::target::{TargetSpec, PROXY_PREFIX};
use crate::security::AllowedHosts;

/// `scheme:...` or scheme-relative `//host/...`.
pub fn is_absolute_location(location: &str) -> bool {
    if location.starts_with("//") {
        return true;
    }

    let mut chars = location.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-') => {}
            _ => return false,
        }
    }
    false
}

/// Rewrite policy for a redirect response.
pub fn should_rewrite(status: StatusCode, location: &str) -> bool {
    if !status.is_redirection() {
        return false;
    }
    matches!(
        status,
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
    ) || !is_absolute_location(location)
}

/// Proxy-relative form of an absolute http(s) URL:
/// `/api/proxy/<encoded origin><path><query><fragment>`.
pub fn proxied_location(url: &Url) -> String {
    let origin = url.origin().ascii_serialization();
    let mut out = format!("{PROXY_PREFIX}{}{}", urlencoding::encode(&origin), url.path());
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Compute the rewritten `Location`, if any.
///
/// `upstream_path` is the composed path-and-query that was sent upstream; a
/// relative location is resolved against `target`'s origin plus that path.
/// `Ok(None)` means the header is relayed as received. Resolution failures
/// are returned to the caller, which logs them and also relays the header as is.
pub fn rewrite_location(
    status: StatusCode,
    location: &str,
    target: &TargetSpec,
    upstream_path: &str,
    allowed_hosts: &AllowedHosts,
) -> Result<Option<String>, url::ParseError> {
    if !should_rewrite(status, location) || location.starts_with(PROXY_PREFIX) {
        return Ok(None);
    }

    let current = target.url().join(upstream_path)?;
    let resolved = current.join(location)?;

    if !matches!(resolved.scheme(), "http" | "https") {
        return Ok(None);
    }

    let host = resolved.host_str().unwrap_or_default();
    if !allowed_hosts.is_allowed(host) {
        tracing::debug!(host = %host, "Redirect target not allowed, relaying Location unchanged");
        return Ok(None);
    }

    Ok(Some(proxied_location(&resolved)))
}
