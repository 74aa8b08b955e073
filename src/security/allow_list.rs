//! Upstream host allow-list.
//!
//! # Responsibilities
//! - Hold the set of hostnames permitted as proxy targets
//! - Answer membership queries case-insensitively
//!
//! # Design Decisions
//! - Built once at startup, immutable afterwards (shared via `Arc`)
//! - An empty list means "no restriction"; this is an explicit opt-in posture, not a safe default
//! - The same check gates both the initial target and rewritten redirect targets

use std::collections::HashSet;

use crate::error::ProxyError;

/// Hostnames the proxy may forward to.
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts {
    hosts: Option<HashSet<String>>,
}

impl AllowedHosts {
    /// Allow every host.
    pub fn unrestricted() -> Self {
        Self { hosts: None }
    }

    /// Build from configured entries. Entries are trimmed and lowercased;
    /// blank entries are dropped. No remaining entries means unrestricted.
    pub fn from_list<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts: HashSet<String> = entries
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        if hosts.is_empty() {
            Self::unrestricted()
        } else {
            Self { hosts: Some(hosts) }
        }
    }

    /// Parse a comma-separated list, as found in `PROXY_ALLOWED_HOSTS`.
    pub fn parse(raw: &str) -> Self {
        Self::from_list(raw.split(','))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.hosts.is_none()
    }

    /// Check whether `hostname` may be contacted.
    pub fn is_allowed(&self, hostname: &str) -> bool {
        match &self.hosts {
            None => true,
            Some(hosts) => hosts.contains(&hostname.to_ascii_lowercase()),
        }
    }

    /// Like [`is_allowed`](Self::is_allowed) but yields the handler error.
    pub fn check(&self, hostname: &str) -> Result<(), ProxyError> {
        if self.is_allowed(hostname) {
            Ok(())
        } else {
            Err(ProxyError::HostNotAllowed)
        }
    }

    /// Number of configured hosts (0 when unrestricted).
    pub fn len(&self) -> usize {
        self.hosts.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
