//! Upstream dispatch.
//!
//! # Responsibilities
//! - Build the outbound request (method, composed URI, headers, streamed body)
//! - Choose the verifying or permissive TLS client for the target
//! - Enforce connect and response-header deadlines
//! - Classify network failures for the handler
//!
//! # Design Decisions
//! - The inbound body is handed to hyper as a stream; nothing is buffered
//! - Only `Host` differs from the inbound header set
//! - No retries; the first failure is surfaced

use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, Uri},
};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::net::tls;
use crate::proxy::target::{TargetScheme, TargetSpec};
use crate::resilience::timeouts;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Pooled HTTP/HTTPS client for upstream targets.
#[derive(Clone)]
pub struct UpstreamClient {
    verified: HttpsClient,
    /// Present only when certificate checks are disabled in config.
    insecure: Option<HttpsClient>,
    response_timeout: Option<Duration>,
}

impl UpstreamClient {
    /// Build the clients described by `config`.
    pub fn new(config: &UpstreamConfig) -> Result<Self, rustls::Error> {
        let provider = tls::crypto_provider();

        let verified_connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider.clone())?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector(config));
        let verified = build_client(config, verified_connector);

        let insecure = if config.insecure_tls {
            tracing::warn!("Upstream TLS certificate verification is DISABLED for https targets");
            let connector = HttpsConnectorBuilder::new()
                .with_tls_config(tls::insecure_client_config(provider)?)
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector(config));
            Some(build_client(config, connector))
        } else {
            None
        };

        Ok(Self {
            verified,
            insecure,
            response_timeout: timeouts::from_secs(config.response_timeout_secs),
        })
    }

    fn client_for(&self, scheme: TargetScheme) -> &HttpsClient {
        match &self.insecure {
            Some(insecure) if scheme.is_https() => insecure,
            _ => &self.verified,
        }
    }

    /// Send `request` upstream and wait for the response head.
    ///
    /// Dropping the returned future (caller disconnected) drops the
    /// in-flight connection along with it.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        scheme: TargetScheme,
    ) -> Result<Response<Incoming>, ProxyError> {
        let client = self.client_for(scheme);
        timeouts::with_deadline(self.response_timeout, client.request(request))
            .await?
            .map_err(classify_error)
    }
}

fn http_connector(config: &UpstreamConfig) -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.enforce_http(false);
    connector.set_nodelay(true);
    connector.set_connect_timeout(timeouts::from_secs(config.connect_timeout_secs));
    connector
}

fn build_client(config: &UpstreamConfig, connector: HttpsConnector<HttpConnector>) -> HttpsClient {
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
        .build(connector)
}

/// Absolute upstream URI: `scheme://authority` + composed path-and-query.
pub fn upstream_uri(target: &TargetSpec, upstream_path: &str) -> Result<Uri, ProxyError> {
    let uri = format!("{}://{}{}", target.scheme().as_str(), target.authority(), upstream_path);
    uri.parse::<Uri>()
        .map_err(|e| ProxyError::Internal(format!("invalid upstream uri {uri:?}: {e}")))
}

/// Turn the inbound request into the upstream one.
///
/// Method, headers and body carry over; `Host` is replaced with the target
/// authority. The HTTP version is left to the client (HTTP/1.1 upstream).
pub fn build_request(
    inbound: Request<Body>,
    target: &TargetSpec,
    upstream_path: &str,
) -> Result<Request<Body>, ProxyError> {
    let uri = upstream_uri(target, upstream_path)?;
    let host = HeaderValue::from_str(&target.authority())
        .map_err(|e| ProxyError::Internal(format!("invalid upstream host: {e}")))?;

    let (parts, body) = inbound.into_parts();

    let mut request = Request::new(body);
    *request.method_mut() = parts.method;
    *request.uri_mut() = uri;
    *request.headers_mut() = parts.headers;
    request.headers_mut().insert(header::HOST, host);

    Ok(request)
}

fn classify_error(err: hyper_util::client::legacy::Error) -> ProxyError {
    if timeouts::is_timeout(&err) {
        ProxyError::UpstreamTimeout
    } else {
        ProxyError::UpstreamUnreachable(describe(&err))
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
