//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming proxy request:
//!     → headers.rs (reject upgrades, classify caller host/scheme)
//!     → allow_list.rs (gate the decoded target host)
//!     → Pass to dispatch
//!
//! Upstream redirect:
//!     → allow_list.rs (same gate, applied to the resolved Location)
//! ```
//!
//! # Design Decisions
//! - The allow-list is the single authorization gate; it is never bypassed
//! - No trust in client-supplied forwarding headers unless configured

pub mod allow_list;
pub mod headers;

pub use allow_list::AllowedHosts;
