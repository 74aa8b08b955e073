//! The `/api/proxy/` request handler.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::cookie::CookieRewrite;
use crate::proxy::relay::{self, RelayContext};
use crate::proxy::{path, target, upstream};
use crate::security::headers;

/// Resolve, dispatch and relay one proxy request.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let request_path = request.uri().path().to_string();

    let response = match forward(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            if err.is_client_error() {
                tracing::warn!(method = %method, path = %request_path, error = %err, "Proxy request rejected");
                metrics::record_rejection(err.kind());
            } else {
                tracing::error!(method = %method, path = %request_path, error = %err, detail = ?err, "Proxy error");
                metrics::record_upstream_error(err.kind());
            }
            err.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

async fn forward(state: &AppState, mut request: Request<Body>) -> Result<Response, ProxyError> {
    if headers::is_upgrade_request(request.method(), request.headers()) {
        return Err(ProxyError::UpgradeNotSupported);
    }
    headers::strip_h2c_offer(request.headers_mut());

    let resolved = target::resolve(
        request.uri().path(),
        request.uri().query(),
        &state.allowed_hosts,
    )?;
    let upstream_path = path::compose(
        resolved.target.base_path(),
        &resolved.remaining_path,
        &resolved.query,
    );

    let caller_host = headers::caller_host(request.headers(), request.uri());
    let caller_https = headers::caller_is_https(
        request.headers(),
        state.inbound_tls,
        state.trust_forwarded_proto,
    );
    let cookies = CookieRewrite::new(
        headers::cookie_domain(caller_host.as_deref()),
        state.cookie_secure,
        caller_https,
    );

    let upstream_request = upstream::build_request(request, &resolved.target, &upstream_path)?;

    tracing::debug!(
        target = %resolved.target.origin(),
        method = %upstream_request.method(),
        upstream = %upstream_request.uri(),
        "Dispatching upstream request"
    );

    let response = state
        .client
        .dispatch(upstream_request, resolved.target.scheme())
        .await?;

    let ctx = RelayContext {
        cookies,
        target: &resolved.target,
        upstream_path: &upstream_path,
        allowed_hosts: &state.allowed_hosts,
    };
    Ok(relay::relay(response, &ctx))
}
