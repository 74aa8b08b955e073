//! Dynamic Forward Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                   DYNAMIC PROXY                       │
//!                        │                                                       │
//!   Browser request      │  ┌────────┐   ┌─────────┐   ┌──────────┐             │
//!   /api/proxy/<enc>/... ┼─▶│  http  │──▶│ target  │──▶│   path   │             │
//!                        │  │ server │   │resolver │   │ composer │             │
//!                        │  └───┬────┘   └────┬────┘   └────┬─────┘             │
//!                        │      │ other paths │ allow-list  │                    │
//!                        │      ▼             ▼             ▼                    │
//!                        │  ┌────────┐   ┌──────────────────────┐               │
//!                        │  │ static │   │ upstream dispatcher  │───────────────┼──▶ Upstream
//!                        │  │ files  │   └──────────┬───────────┘               │    origin
//!                        │  └────────┘              ▼                            │
//!   Browser response     │               ┌──────────────────────┐               │
//!   ◀────────────────────┼───────────────│ relay: cookie +      │◀──────────────┼─── response
//!                        │               │ redirect rewriting   │               │
//!                        │               └──────────────────────┘               │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use dynamic_proxy::config::{self, loader, validate_config, ConfigError, ProxyConfig};
use dynamic_proxy::http::HttpServer;
use dynamic_proxy::lifecycle::{signals, Shutdown};
use dynamic_proxy::net::tls;
use dynamic_proxy::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "dynamic-proxy")]
#[command(about = "Dynamic HTTP forward proxy serving /api/proxy/<encoded-target>/...", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host (overrides HOST and the config file).
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT and the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Comma-separated upstream allow-list (overrides PROXY_ALLOWED_HOSTS).
    #[arg(long)]
    allowed_hosts: Option<String>,

    /// Skip upstream TLS certificate verification (development only).
    #[arg(long)]
    insecure_https: bool,

    /// Directory with the built UI to serve for non-proxy paths.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    logging::init(&config.observability);
    tracing::info!("dynamic-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        allowed_hosts = config.proxy.allowed_hosts.len(),
        cookie_secure = config.proxy.cookie_secure,
        insecure_upstream_tls = config.upstream.insecure_tls,
        "Configuration loaded"
    );

    tls::install_crypto_provider();

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .context("metrics address")?;
        metrics::init_metrics(addr);
    }

    let bind_address: SocketAddr = config
        .listener
        .bind_address
        .parse()
        .context("bind address")?;
    let listener_tls = config.listener.tls.clone();

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    match listener_tls {
        Some(tls_config) => {
            let rustls = tls::load_tls_config(
                Path::new(&tls_config.cert_path),
                Path::new(&tls_config.key_path),
            )
            .await
            .context("loading listener TLS certificate")?;
            server.run_tls(bind_address, rustls, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(bind_address)
                .await
                .with_context(|| format!("binding {bind_address}"))?;
            server.run(listener, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// defaults < config file < environment < CLI flags, then validate.
fn build_config(cli: &Cli) -> anyhow::Result<ProxyConfig> {
    let mut config = match &cli.config {
        Some(path) => loader::read_config(path)
            .with_context(|| format!("reading config file {}", path.display()))?,
        None => ProxyConfig::default(),
    };

    config::apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    if cli.host.is_some() || cli.port.is_some() {
        let port = cli.port.map(|p| p.to_string());
        loader::set_bind_address(&mut config, cli.host.as_deref(), port.as_deref());
    }
    if let Some(hosts) = &cli.allowed_hosts {
        config.proxy.allowed_hosts = loader::split_hosts(hosts);
    }
    if cli.insecure_https {
        config.upstream.insecure_tls = true;
    }
    if let Some(dir) = &cli.static_dir {
        config.static_files.dir = Some(dir.display().to_string());
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
