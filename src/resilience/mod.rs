//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → connect timeout (enforced by the connector)
//!     → timeouts.rs (deadline for response headers)
//!     → On failure: surfaced immediately, never retried
//! ```
//!
//! # Design Decisions
//! - No retries at this layer; retry policy belongs to the caller
//! - Every upstream call can be given a deadline through config

pub mod timeouts;
