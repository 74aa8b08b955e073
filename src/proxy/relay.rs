//! Response relay.
//!
//! # Responsibilities
//! - Rewrite `Set-Cookie` on every upstream response
//! - Rewrite `Location` on 3xx responses where policy requires it
//! - Stream the upstream body back verbatim
//!
//! # Design Decisions
//! - Header rewrites finish before anything is written to the caller
//! - Rewrite failures are logged and the header is relayed unchanged
//! - An upstream body error after the head was sent aborts the stream; the
//!   status line and headers are never revisited

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};
use http_body_util::BodyExt;
use hyper::body::Incoming;

use crate::observability::metrics;
use crate::proxy::cookie::CookieRewrite;
use crate::proxy::redirect;
use crate::proxy::target::TargetSpec;
use crate::security::AllowedHosts;

/// Everything the header rewriters need to know about the exchange.
#[derive(Debug)]
pub struct RelayContext<'a> {
    pub cookies: CookieRewrite,
    pub target: &'a TargetSpec,
    /// Path-and-query that was sent upstream.
    pub upstream_path: &'a str,
    pub allowed_hosts: &'a AllowedHosts,
}

/// Apply header rewrites and wrap the upstream body for the caller.
pub fn relay(response: Response<Incoming>, ctx: &RelayContext<'_>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();

    rewrite_set_cookies(&mut parts.headers, &ctx.cookies);
    rewrite_location(parts.status, &mut parts.headers, ctx);

    let body = body.map_err(|err| {
        tracing::error!(error = %err, "Relay error: upstream body failed after headers were sent");
        metrics::record_relay_error();
        err
    });

    Response::from_parts(parts, Body::new(body))
}

/// Rewrite every `Set-Cookie` value in place, preserving order.
pub fn rewrite_set_cookies(headers: &mut HeaderMap, rewrite: &CookieRewrite) {
    if !headers.contains_key(header::SET_COOKIE) {
        return;
    }

    let original: Vec<HeaderValue> = headers.get_all(header::SET_COOKIE).iter().cloned().collect();
    headers.remove(header::SET_COOKIE);

    for value in original {
        let rewritten = match value.to_str() {
            Ok(cookie) => match HeaderValue::from_str(&rewrite.apply(cookie)) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to rewrite Set-Cookie, relaying unchanged");
                    value
                }
            },
            Err(_) => {
                tracing::warn!("Set-Cookie is not valid UTF-8, relaying unchanged");
                value
            }
        };
        headers.append(header::SET_COOKIE, rewritten);
    }
}

/// Rewrite `Location` on redirects so the browser stays on the proxy origin.
pub fn rewrite_location(status: StatusCode, headers: &mut HeaderMap, ctx: &RelayContext<'_>) {
    if !status.is_redirection() {
        return;
    }
    let location = match headers.get(header::LOCATION) {
        Some(value) => value,
        None => return,
    };
    let location = match location.to_str() {
        Ok(l) => l.to_owned(),
        Err(_) => {
            tracing::warn!("Failed to rewrite redirect Location: header is not valid UTF-8");
            return;
        }
    };

    match redirect::rewrite_location(
        status,
        &location,
        ctx.target,
        ctx.upstream_path,
        ctx.allowed_hosts,
    ) {
        Ok(Some(proxied)) => match HeaderValue::from_str(&proxied) {
            Ok(value) => {
                tracing::debug!(from = %location, to = %proxied, "Rewrote redirect Location");
                headers.insert(header::LOCATION, value);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to rewrite redirect Location"),
        },
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, location = %location, "Failed to rewrite redirect Location");
        }
    }
}
