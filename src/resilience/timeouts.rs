//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the wait for upstream response headers
//! - Recognise connect timeouts buried in client error chains
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeouts keep their own error kind for logs and metrics; callers still see a 500
//! - Body streaming is not bounded here; long-lived streams (SSE) must survive

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::time::Duration;

use crate::error::ProxyError;

/// Await `fut`, failing with [`ProxyError::UpstreamTimeout`] after `limit`.
/// `None` waits indefinitely.
pub async fn with_deadline<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, ProxyError>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ProxyError::UpstreamTimeout),
        None => Ok(fut.await),
    }
}

/// Convert a seconds setting into an optional limit (0 disables).
pub fn from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// True if any error in the source chain is an I/O timeout.
pub fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = err.source();
    }
    false
}
