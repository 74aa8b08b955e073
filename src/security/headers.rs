//! Caller-facing header inspection.
//!
//! # Responsibilities
//! - Determine the caller's host name for cookie domain rewriting
//! - Determine whether the caller connection is HTTPS
//! - Detect protocol upgrade requests, which are not relayed
//! - Strip an optional `h2c` upgrade offer so the request is relayed as HTTP/1.1
//!
//! # Design Decisions
//! - `X-Forwarded-Proto` is only honoured when explicitly trusted in config
//! - Missing or unusable `Host` falls back to `localhost`

use axum::http::{header, HeaderMap, HeaderValue, Method, Uri};

const DEFAULT_HOST: &str = "localhost";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const HTTP2_SETTINGS: &str = "http2-settings";
const H2C: &str = "h2c";

/// Raw `Host` value of the inbound request, falling back to the URI authority
/// (HTTP/2 callers send `:authority` instead of `Host`).
pub fn caller_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| uri.authority().map(|a| a.as_str().to_owned()))
        .filter(|h| !h.is_empty())
}

/// Host name portion (port stripped) of a `Host` header value.
pub fn cookie_domain(host: Option<&str>) -> String {
    let host = match host.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return DEFAULT_HOST.to_string(),
    };

    // Bracketed IPv6 literal, e.g. "[::1]:8080".
    if host.starts_with('[') {
        if let Some(end) = host.find(']') {
            return host[..=end].to_string();
        }
    }

    match host.split(':').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_HOST.to_string(),
    }
}

/// Whether the client-to-proxy leg is HTTPS.
pub fn caller_is_https(headers: &HeaderMap, inbound_tls: bool, trust_forwarded_proto: bool) -> bool {
    if inbound_tls {
        return true;
    }
    trust_forwarded_proto
        && headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
}

/// WebSocket upgrades and CONNECT tunnels need a dedicated handler.
///
/// An `Upgrade` that only offers `h2c` is not one: the server may ignore it
/// and answer over HTTP/1.1. Unreadable `Upgrade` values count as upgrades.
pub fn is_upgrade_request(method: &Method, headers: &HeaderMap) -> bool {
    if *method == Method::CONNECT {
        return true;
    }
    headers.get_all(header::UPGRADE).iter().any(|value| match value.to_str() {
        Ok(protocols) => token_list(protocols).any(|p| !p.eq_ignore_ascii_case(H2C)),
        Err(_) => true,
    })
}

/// Remove an `h2c` upgrade offer: `Upgrade`, `HTTP2-Settings` and their
/// `Connection` tokens. Other `Connection` tokens are kept.
///
/// Call only after [`is_upgrade_request`] returned false.
pub fn strip_h2c_offer(headers: &mut HeaderMap) {
    if !headers.contains_key(header::UPGRADE) && !headers.contains_key(HTTP2_SETTINGS) {
        return;
    }
    headers.remove(header::UPGRADE);
    headers.remove(HTTP2_SETTINGS);

    let remaining: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(token_list)
        .filter(|t| !t.eq_ignore_ascii_case("upgrade") && !t.eq_ignore_ascii_case(HTTP2_SETTINGS))
        .map(str::to_owned)
        .collect();

    headers.remove(header::CONNECTION);
    if remaining.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.join(", ")) {
        headers.insert(header::CONNECTION, value);
    }
}

fn token_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}
