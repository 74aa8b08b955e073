//! Static UI bundle for every path outside `/api/proxy/`.
//!
//! Unknown paths fall back to `index.html` (single-page app). Hashed build
//! assets under `/assets/` are cached forever; everything else revalidates.

use std::path::Path;

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::services::{ServeDir, ServeFile};

const ASSETS_PREFIX: &str = "/assets/";
const IMMUTABLE: &str = "public,max-age=31536000,immutable";
const NO_CACHE: &str = "no-cache";

/// Router serving `dir` with SPA fallback and cache headers.
pub fn service(dir: &str) -> Router {
    let index = Path::new(dir).join("index.html");
    let files = ServeDir::new(dir).fallback(ServeFile::new(index));

    Router::new()
        .fallback_service(files)
        .layer(middleware::from_fn(cache_control))
}

async fn cache_control(request: Request, next: Next) -> Response {
    let policy = if request.uri().path().starts_with(ASSETS_PREFIX) {
        IMMUTABLE
    } else {
        NO_CACHE
    };

    let mut response = next.run(request).await;
    if response.status().is_success() || response.status() == StatusCode::NOT_MODIFIED {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(policy));
    }
    response
}
