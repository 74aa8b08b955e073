//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy handler and relay produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every request span by tower-http
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
