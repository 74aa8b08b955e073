//! End-to-end proxy behavior against local mock upstreams.

mod common;

use std::sync::atomic::Ordering;

use common::*;
use dynamic_proxy::config::ProxyConfig;

fn allow_loopback() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.proxy.allowed_hosts = vec!["127.0.0.1".into()];
    config
}

#[tokio::test]
async fn relays_json_with_path_query_and_host_override() {
    let (upstream, log) = start_recording_upstream().await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let target = format!("http://{}/v1", upstream);
    let response = client()
        .get(proxy_url(proxy, &target, "/users?active=true"))
        .header("accept", "application/json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = response.text().await.unwrap();
    assert_eq!(body, ECHO_BODY);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["users"][0]["name"], "ada");

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path_and_query, "/v1/users?active=true");
    assert_eq!(seen[0].headers["host"], upstream.to_string().as_str());
    assert_eq!(seen[0].headers["accept"], "application/json");

    shutdown.trigger();
}

#[tokio::test]
async fn disallowed_host_is_rejected_without_contacting_upstream() {
    let (upstream, hits) = start_raw_upstream("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
    let mut config = ProxyConfig::default();
    config.proxy.allowed_hosts = vec!["other.example.com".into()];
    let (proxy, shutdown) = start_proxy(config).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}", upstream), "/anything"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    assert_eq!(response.text().await.unwrap(), "Proxy target not allowed");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn set_cookie_is_scoped_to_the_caller() {
    let (upstream, _) = start_raw_upstream(
        "HTTP/1.1 200 OK\r\n\
         Set-Cookie: session=abc; Domain=api.example.com; Path=/v1; Secure; SameSite=None\r\n\
         Set-Cookie: theme=dark; Path=/v1\r\n\
         Content-Length: 2\r\n\
         \r\n\
         ok",
    )
    .await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .post(proxy_url(proxy, &format!("http://{}/v1", upstream), "/login"))
        .header("host", "localhost:8080")
        .body("user=ada")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let cookies: Vec<_> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(
        cookies,
        vec![
            "session=abc; Domain=localhost; Path=/; SameSite=Lax".to_string(),
            "theme=dark; Path=/".to_string(),
        ]
    );

    shutdown.trigger();
}

#[tokio::test]
async fn relative_permanent_redirect_stays_behind_the_proxy() {
    let (upstream, _) = start_raw_upstream(
        "HTTP/1.1 308 Permanent Redirect\r\nLocation: /v2/users\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}/v1", upstream), "/users"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 308);
    let expected = format!(
        "/api/proxy/{}/v2/users",
        urlencoding::encode(&format!("http://{}", upstream))
    );
    assert_eq!(response.headers()["location"], expected.as_str());

    shutdown.trigger();
}

#[tokio::test]
async fn absolute_redirect_to_foreign_origin_passes_through() {
    let (upstream, _) = start_raw_upstream(
        "HTTP/1.1 302 Found\r\nLocation: https://sso.example.org/login\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}", upstream), "/account"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(response.headers()["location"], "https://sso.example.org/login");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upstream_is_reported_as_proxy_error() {
    let dead = closed_port().await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}", dead), "/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert!(response.text().await.unwrap().starts_with("Proxy error:"));

    shutdown.trigger();
}

#[tokio::test]
async fn silent_upstream_times_out() {
    let silent = start_silent_upstream().await;
    let mut config = allow_loopback();
    config.upstream.response_timeout_secs = 1;
    let (proxy, shutdown) = start_proxy(config).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}", silent), "/slow"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "Proxy error: upstream timed out");

    shutdown.trigger();
}

#[tokio::test]
async fn large_request_body_is_streamed_upstream() {
    let (upstream, log) = start_recording_upstream().await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let payload = vec![b'x'; 2 * 1024 * 1024];
    let response = client()
        .put(proxy_url(proxy, &format!("http://{}", upstream), "/upload"))
        .body(payload.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["active"], true);

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen[0].method, "PUT");
    assert_eq!(seen[0].path_and_query, "/upload");
    assert_eq!(seen[0].body_len, payload.len());

    shutdown.trigger();
}

#[tokio::test]
async fn bare_origin_without_path_hits_upstream_root() {
    let (upstream, log) = start_recording_upstream().await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}", upstream), "?q=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(log.lock().unwrap()[0].path_and_query, "/?q=1");

    shutdown.trigger();
}

#[tokio::test]
async fn secure_cookie_kept_for_trusted_https_caller() {
    let (upstream, _) = start_raw_upstream(
        "HTTP/1.1 200 OK\r\n\
         Set-Cookie: session=abc; Domain=api.example.com; Path=/v1; Secure; SameSite=None\r\n\
         Content-Length: 0\r\n\
         \r\n",
    )
    .await;
    let mut config = allow_loopback();
    config.proxy.cookie_secure = true;
    config.listener.trust_forwarded_proto = true;
    let (proxy, shutdown) = start_proxy(config).await;

    let url = proxy_url(proxy, &format!("http://{}", upstream), "/login");

    let https = client()
        .get(&url)
        .header("host", "localhost:8080")
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();
    assert_eq!(
        https.headers()["set-cookie"],
        "session=abc; Domain=localhost; Path=/; Secure; SameSite=Lax"
    );

    let plain = client()
        .get(&url)
        .header("host", "localhost:8080")
        .send()
        .await
        .unwrap();
    assert_eq!(
        plain.headers()["set-cookie"],
        "session=abc; Domain=localhost; Path=/; SameSite=Lax"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn absolute_307_to_allowed_host_is_rewritten() {
    let (upstream, _) = start_raw_upstream(
        "HTTP/1.1 307 Temporary Redirect\r\n\
         Location: http://127.0.0.1:9443/v2/items?x=1\r\n\
         Content-Length: 0\r\n\
         \r\n",
    )
    .await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}/v1", upstream), "/items"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()["location"],
        "/api/proxy/http%3A%2F%2F127.0.0.1%3A9443/v2/items?x=1"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn absolute_307_to_disallowed_host_passes_through() {
    let (upstream, _) = start_raw_upstream(
        "HTTP/1.1 307 Temporary Redirect\r\n\
         Location: https://elsewhere.example.net/landing\r\n\
         Content-Length: 0\r\n\
         \r\n",
    )
    .await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}", upstream), "/go"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 307);
    assert_eq!(response.headers()["location"], "https://elsewhere.example.net/landing");

    shutdown.trigger();
}

#[tokio::test]
async fn h2c_upgrade_offer_is_proxied_as_plain_http() {
    let (upstream, log) = start_recording_upstream().await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let request = format!(
        "GET {} HTTP/1.1\r\n\
         Host: localhost:8080\r\n\
         Connection: Upgrade, HTTP2-Settings, close\r\n\
         Upgrade: h2c\r\n\
         HTTP2-Settings: AAMAAABkAAQCAAAAAAIAAAAA\r\n\
         \r\n",
        proxy_path(&format!("http://{}", upstream), "/x")
    );
    let response = raw_exchange(proxy, &request).await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with(ECHO_BODY));

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path_and_query, "/x");
    assert!(!seen[0].headers.contains_key("upgrade"));
    assert!(!seen[0].headers.contains_key("http2-settings"));

    shutdown.trigger();
}

#[tokio::test]
async fn websocket_upgrade_is_refused_without_contacting_upstream() {
    let (upstream, hits) = start_raw_upstream("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let request = format!(
        "GET {} HTTP/1.1\r\n\
         Host: localhost:8080\r\n\
         Connection: Upgrade, close\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         \r\n",
        proxy_path(&format!("http://{}", upstream), "/ws")
    );
    let response = raw_exchange(proxy, &request).await;

    assert!(response.starts_with("HTTP/1.1 501"), "{response}");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn insecure_tls_reaches_self_signed_upstream() {
    let upstream = start_tls_upstream().await;
    let target = format!("https://{}", upstream);

    let mut config = allow_loopback();
    config.upstream.insecure_tls = true;
    let (proxy, shutdown) = start_proxy(config).await;

    let response = client()
        .get(proxy_url(proxy, &target, "/hello"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), TLS_BODY);

    shutdown.trigger();
}

#[tokio::test]
async fn self_signed_upstream_is_rejected_by_default() {
    let upstream = start_tls_upstream().await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("https://{}", upstream), "/hello"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert!(response.text().await.unwrap().starts_with("Proxy error:"));

    shutdown.trigger();
}

#[tokio::test]
async fn caller_disconnect_cancels_upstream_request() {
    let (upstream, mut events) = start_hanging_upstream().await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let mut caller = tokio::net::TcpStream::connect(proxy).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost:8080\r\n\r\n",
        proxy_path(&format!("http://{}", upstream), "/slow")
    );
    tokio::io::AsyncWriteExt::write_all(&mut caller, request.as_bytes())
        .await
        .unwrap();

    assert_eq!(next_event(&mut events).await, UpstreamEvent::RequestReceived);
    drop(caller);
    assert_eq!(next_event(&mut events).await, UpstreamEvent::Closed);

    shutdown.trigger();
}

#[tokio::test]
async fn truncated_upstream_body_aborts_the_response() {
    let (upstream, _) = start_raw_upstream(
        "HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort",
    )
    .await;
    let (proxy, shutdown) = start_proxy(allow_loopback()).await;

    let response = client()
        .get(proxy_url(proxy, &format!("http://{}", upstream), "/file"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.bytes().await.is_err());

    shutdown.trigger();
}
