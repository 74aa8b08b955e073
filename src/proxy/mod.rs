//! Dynamic forward proxy subsystem.
//!
//! # Data Flow
//! ```text
//! /api/proxy/<encoded-origin>[/<path>][?<query>]
//!     → target.rs (split, decode, scheme + allow-list checks)
//!     → path.rs (join base path and trailing path, append query)
//!     → upstream.rs (send method, headers with Host replaced, streamed body)
//!     → relay.rs
//!         → cookie.rs (Set-Cookie rewrite, every response)
//!         → redirect.rs (Location rewrite, 3xx only)
//!     → stream upstream body back to the caller
//! ```
//!
//! # Design Decisions
//! - Request-scoped state only; config is read-only after startup
//! - Bodies are never buffered or transformed
//! - Protocol upgrades are rejected explicitly instead of probed for

pub mod cookie;
pub mod handler;
pub mod path;
pub mod redirect;
pub mod relay;
pub mod target;
pub mod upstream;

pub use handler::proxy_handler;
pub use target::{TargetSpec, PROXY_PREFIX};
pub use upstream::UpstreamClient;
