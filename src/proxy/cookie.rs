//! `Set-Cookie` rewriting.
//!
//! Upstream cookies are scoped to the upstream origin; the browser only ever
//! talks to the proxy, so each attribute that would pin the cookie elsewhere
//! is rewritten in place. Attributes the cookie does not carry are never added.

/// Per-response cookie rewrite parameters.
#[derive(Debug, Clone)]
pub struct CookieRewrite {
    /// Replacement for any `Domain=` value (the caller's host, port stripped).
    pub domain: String,
    /// Keep `Secure` (only when enabled in config and the caller uses HTTPS).
    pub keep_secure: bool,
}

impl CookieRewrite {
    pub fn new(domain: impl Into<String>, cookie_secure: bool, caller_https: bool) -> Self {
        Self {
            domain: domain.into(),
            keep_secure: cookie_secure && caller_https,
        }
    }

    /// Rewrite a single `Set-Cookie` value.
    ///
    /// The leading `name=value` pair is preserved verbatim. Of the attributes:
    /// `Domain` takes the caller's host, `Path` becomes `/`, `SameSite`
    /// becomes `Lax`, and `Secure` is kept or dropped per [`Self::keep_secure`].
    pub fn apply(&self, cookie: &str) -> String {
        let mut segments = cookie.split(';');
        let mut out = String::with_capacity(cookie.len());
        out.push_str(segments.next().unwrap_or_default());

        for segment in segments {
            let trimmed = segment.trim_start();
            let (name, value) = match trimmed.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (trimmed, None),
            };
            let has_value = value.is_some_and(|v| !v.is_empty());

            match name.trim_end().to_ascii_lowercase().as_str() {
                "domain" if has_value => {
                    let leading = &segment[..segment.len() - trimmed.len()];
                    out.push(';');
                    out.push_str(leading);
                    out.push_str(name);
                    out.push('=');
                    out.push_str(&self.domain);
                }
                "path" if has_value => out.push_str("; Path=/"),
                "samesite" if has_value => out.push_str("; SameSite=Lax"),
                "secure" if value.is_none() => {
                    if self.keep_secure {
                        out.push_str("; Secure");
                    }
                }
                _ => {
                    out.push(';');
                    out.push_str(segment);
                }
            }
        }

        out
    }
}
