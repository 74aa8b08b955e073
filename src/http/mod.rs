//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → /api/proxy/* → proxy handler
//!     → anything else → static_files.rs (or 404)
//!     → Send to client
//! ```

pub mod server;
pub mod static_files;

pub use server::{AppState, HttpServer, ServerError};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";
