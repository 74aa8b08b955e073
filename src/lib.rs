//! Dynamic HTTP forward proxy.
//!
//! Accepts `/api/proxy/<percent-encoded origin>[/<path>][?<query>]`, forwards
//! the request to that origin, and relays the response with `Set-Cookie` and
//! `Location` rewritten so a browser talking only to this server behaves
//! correctly against the request-specified backend.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod proxy;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
