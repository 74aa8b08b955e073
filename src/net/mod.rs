//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake via axum-server)
//!     → Hand off to HTTP layer
//!
//! Outgoing upstream connection
//!     → tls.rs (verifying or, if configured, permissive client config)
//! ```
//!
//! # Design Decisions
//! - TLS is optional on the listener and handled transparently
//! - A TLS listener marks every caller connection as HTTPS

pub mod tls;
