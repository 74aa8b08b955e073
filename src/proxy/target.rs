//! Target resolution.
//!
//! # Responsibilities
//! - Split `/api/proxy/<encoded-target>[/<path>][?<query>]` into its parts
//! - Percent-decode and parse the embedded origin
//! - Validate the scheme and apply the host allow-list
//!
//! # Design Decisions
//! - Works on the raw request path; the trailing path is forwarded still encoded
//! - The encoded target ends at the first `/`; the query never belongs to it
//! - Malformed percent escapes are rejected rather than passed through

use url::Url;

use crate::error::ProxyError;
use crate::security::AllowedHosts;

/// Route prefix owned by the proxy handler.
pub const PROXY_PREFIX: &str = "/api/proxy/";

/// Scheme of an upstream target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScheme {
    Http,
    Https,
}

impl TargetScheme {
    fn from_url(url: &Url) -> Option<Self> {
        match url.scheme() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn is_https(&self) -> bool {
        matches!(self, Self::Https)
    }
}

/// Decoded upstream origin plus its own base path.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    url: Url,
    scheme: TargetScheme,
}

impl TargetSpec {
    /// Decode an encoded target segment into a validated http(s) target.
    ///
    /// The allow-list is not consulted here; see [`resolve`].
    pub fn decode(encoded: &str) -> Result<Self, ProxyError> {
        if !has_valid_escapes(encoded) {
            return Err(ProxyError::InvalidTarget);
        }
        let decoded = urlencoding::decode(encoded).map_err(|_| ProxyError::InvalidTarget)?;
        let url = Url::parse(&decoded).map_err(|_| ProxyError::InvalidTarget)?;
        Self::from_url(url)
    }

    /// Validate an already parsed URL as a proxy target.
    pub fn from_url(url: Url) -> Result<Self, ProxyError> {
        let scheme = TargetScheme::from_url(&url).ok_or(ProxyError::UnsupportedScheme)?;
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self { url, scheme }),
            _ => Err(ProxyError::InvalidTarget),
        }
    }

    pub fn scheme(&self) -> TargetScheme {
        self.scheme
    }

    /// Host name, lowercased by URL parsing (IPv6 literals keep their brackets).
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, `None` when the scheme default is used.
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }


    /// `host[:port]`, as sent in the upstream `Host` header.
    pub fn authority(&self) -> String {
        match self.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    /// The target's own path component (`/` when none was given).
    pub fn base_path(&self) -> &str {
        self.url.path()
    }

    /// `scheme://host[:port]`.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// A proxy request decomposed into target, trailing path and query.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub target: TargetSpec,
    /// Trailing path after the encoded segment, including its leading `/`, or empty.
    pub remaining_path: String,
    /// Original query including the leading `?`, or empty.
    pub query: String,
}

/// Raw segments of a proxy path before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyPath<'a> {
    pub encoded_target: &'a str,
    pub remaining_path: &'a str,
}

/// Split a request path into its encoded target and trailing path.
pub fn split_proxy_path(path: &str) -> Result<ProxyPath<'_>, ProxyError> {
    let rest = path
        .strip_prefix(PROXY_PREFIX)
        .ok_or(ProxyError::MalformedRequest)?;

    let (encoded_target, remaining_path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    if encoded_target.is_empty() {
        return Err(ProxyError::MalformedRequest);
    }

    Ok(ProxyPath {
        encoded_target,
        remaining_path,
    })
}

/// Resolve an inbound path and query into a validated, allowed target.
pub fn resolve(
    path: &str,
    query: Option<&str>,
    allowed_hosts: &AllowedHosts,
) -> Result<ResolvedTarget, ProxyError> {
    let parts = split_proxy_path(path)?;
    let target = TargetSpec::decode(parts.encoded_target)?;
    allowed_hosts.check(target.host())?;

    Ok(ResolvedTarget {
        target,
        remaining_path: parts.remaining_path.to_string(),
        query: query.map(|q| format!("?{q}")).unwrap_or_default(),
    })
}

/// Every `%` must introduce two hex digits.
fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .map(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                .unwrap_or(false);
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
