//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::IntoResponse,
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use dynamic_proxy::config::ProxyConfig;
use dynamic_proxy::http::HttpServer;
use dynamic_proxy::lifecycle::Shutdown;
use dynamic_proxy::net::tls;

/// A request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body_len: usize,
}

pub type RequestLog = Arc<Mutex<Vec<Recorded>>>;

/// Fixed body returned by the recording upstream.
pub const ECHO_BODY: &str = r#"{"users":[{"id":1,"name":"ada"}],"active":true}"#;

/// Start an upstream that records every request and answers with [`ECHO_BODY`].
pub async fn start_recording_upstream() -> (SocketAddr, RequestLog) {
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));

    async fn record(State(log): State<RequestLog>, request: Request<Body>) -> impl IntoResponse {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        log.lock().unwrap().push(Recorded {
            method: parts.method.to_string(),
            path_and_query: parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default(),
            headers: parts.headers,
            body_len: body.len(),
        });
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            ECHO_BODY,
        )
    }

    let app = Router::new().fallback(record).with_state(log.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, log)
}

/// Start a raw TCP upstream that answers every request with `response`
/// verbatim. Returns the address and a hit counter.
pub async fn start_raw_upstream(response: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// Start an upstream that accepts connections and never answers.
pub async fn start_silent_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Body served by [`start_tls_upstream`].
pub const TLS_BODY: &str = "hello over tls";

/// Start an HTTPS upstream with the self-signed certificate in `tests/fixtures`.
pub async fn start_tls_upstream() -> SocketAddr {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let config = tls::load_tls_config(
        &fixtures.join("upstream-cert.pem"),
        &fixtures.join("upstream-key.pem"),
    )
    .await
    .unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(|| async { TLS_BODY });
    tokio::spawn(async move {
        let _ = axum_server::from_tcp_rustls(listener, config)
            .serve(app.into_make_service())
            .await;
    });

    addr
}

/// What a [`start_hanging_upstream`] connection went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// A full request head arrived.
    RequestReceived,
    /// The proxy closed the connection.
    Closed,
}

/// Start an upstream that reads requests, never answers, and reports when the
/// proxy hangs up.
pub async fn start_hanging_upstream() -> (SocketAddr, mpsc::UnboundedReceiver<UpstreamEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let _ = tx.send(UpstreamEvent::RequestReceived);

                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                let _ = tx.send(UpstreamEvent::Closed);
            });
        }
    });

    (addr, rx)
}

/// Next event from a hanging upstream, failing the test after five seconds.
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<UpstreamEvent>) -> UpstreamEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("upstream event timed out")
        .expect("upstream event channel closed")
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// `/api/proxy/<encoded target><rest>`.
pub fn proxy_path(target: &str, rest: &str) -> String {
    format!("/api/proxy/{}{}", urlencoding::encode(target), rest)
}

/// [`proxy_path`] as an absolute URL on the proxy.
pub fn proxy_url(proxy: SocketAddr, target: &str, rest: &str) -> String {
    format!("http://{}{}", proxy, proxy_path(target, rest))
}

/// Write `request` verbatim to the proxy and read until it closes the
/// connection. The request should carry `Connection: close`.
pub async fn raw_exchange(proxy: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("proxy did not close the connection")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Test client that never follows redirects or uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
