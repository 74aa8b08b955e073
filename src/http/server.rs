//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy route family and static fallback
//! - Wire up middleware (tracing, request ID)
//! - Build the upstream clients once, from immutable config
//! - Serve over plain TCP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::static_files;
use crate::http::X_REQUEST_ID;
use crate::lifecycle::shutdown;
use crate::proxy::{proxy_handler, UpstreamClient};
use crate::security::AllowedHosts;

/// How long in-flight TLS connections may drain after shutdown is requested.
const TLS_DRAIN_SECS: u64 = 10;

/// Application state injected into handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub allowed_hosts: Arc<AllowedHosts>,
    pub client: UpstreamClient,
    /// Keep `Secure` on rewritten cookies for HTTPS callers.
    pub cookie_secure: bool,
    /// The listener terminates TLS itself.
    pub inbound_tls: bool,
    pub trust_forwarded_proto: bool,
}

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream TLS client: {0}")]
    UpstreamTls(#[from] rustls::Error),
}

/// HTTP server hosting the proxy endpoint.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let allowed_hosts = Arc::new(AllowedHosts::from_list(&config.proxy.allowed_hosts));
        if allowed_hosts.is_unrestricted() {
            tracing::warn!("No upstream allow-list configured: any reachable host can be proxied");
        } else {
            tracing::info!(hosts = allowed_hosts.len(), "Upstream allow-list active");
        }

        let state = AppState {
            allowed_hosts,
            client: UpstreamClient::new(&config.upstream)?,
            cookie_secure: config.proxy.cookie_secure,
            inbound_tls: config.listener.tls.is_some(),
            trust_forwarded_proto: config.listener.trust_forwarded_proto,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let proxy_routes = Router::new()
            .route("/api/proxy/", any(proxy_handler))
            .route("/api/proxy/{*rest}", any(proxy_handler))
            .with_state(state);

        let router = match &config.static_files.dir {
            Some(dir) => proxy_routes.fallback_service(static_files::service(dir)),
            None => proxy_routes.fallback(not_found),
        };

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Clone of the fully layered router (useful for in-process testing).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown::wait(shutdown).await;
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
