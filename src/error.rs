//! Error taxonomy for the proxy handler.
//!
//! # Design Decisions
//! - Client-input errors are raised before any upstream call is attempted
//! - Every error renders as a `text/plain` response; status and body are fixed per variant
//! - Relay errors never reach this type: once headers are flushed the body stream is aborted instead

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced by a single proxy exchange.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Path does not have the `/api/proxy/<target>[/<path>]` shape.
    #[error("Invalid proxy request format")]
    MalformedRequest,

    /// The encoded target could not be decoded or parsed as an absolute URL.
    #[error("Invalid proxy target specified")]
    InvalidTarget,

    /// The decoded target uses a scheme other than http or https.
    #[error("Unsupported target protocol")]
    UnsupportedScheme,

    /// The target host is not on the configured allow-list.
    #[error("Proxy target not allowed")]
    HostNotAllowed,

    /// Protocol upgrades (WebSocket, CONNECT) are not relayed by this handler.
    #[error("Protocol upgrades are not proxied")]
    UpgradeNotSupported,

    /// Network or TLS failure talking to the resolved target.
    #[error("Proxy error: {0}")]
    UpstreamUnreachable(String),

    /// The upstream did not connect or answer within the configured deadline.
    #[error("Proxy error: upstream timed out")]
    UpstreamTimeout,

    #[error("Internal proxy error")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status returned to the caller for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MalformedRequest
            | ProxyError::InvalidTarget
            | ProxyError::UnsupportedScheme => StatusCode::BAD_REQUEST,
            ProxyError::HostNotAllowed => StatusCode::FORBIDDEN,
            ProxyError::UpgradeNotSupported => StatusCode::NOT_IMPLEMENTED,
            ProxyError::UpstreamUnreachable(_)
            | ProxyError::UpstreamTimeout
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MalformedRequest => "malformed_request",
            ProxyError::InvalidTarget => "invalid_target",
            ProxyError::UnsupportedScheme => "unsupported_scheme",
            ProxyError::HostNotAllowed => "host_not_allowed",
            ProxyError::UpgradeNotSupported => "upgrade_not_supported",
            ProxyError::UpstreamUnreachable(_) => "upstream_unreachable",
            ProxyError::UpstreamTimeout => "upstream_timeout",
            ProxyError::Internal(_) => "internal",
        }
    }

    /// True for errors caused by the caller's input rather than the upstream.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain")],
            self.to_string(),
        )
            .into_response()
    }
}
