//! Inspector endpoint discovery.
//!
//! Finding the application's WebSocket inspector endpoint (polling an HTTP
//! listing, picking a page) is platform plumbing that lives outside the
//! relay. The relay only consumes this interface, retrying until the
//! endpoint becomes resolvable or the session is cancelled.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How long to wait between discovery attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of discovery attempts before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 10;

/// Errors from endpoint discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The inspector did not answer or listed no debuggable page.
    #[error("no inspector endpoint reachable at {base}: {reason}")]
    Unreachable {
        /// Base URL that was polled.
        base: String,
        /// Underlying failure.
        reason: String,
    },

    /// The session was cancelled while waiting.
    #[error("inspector discovery cancelled")]
    Cancelled,
}

/// Resolves a reachable inspector WebSocket endpoint from an HTTP base URL.
#[async_trait]
pub trait InspectorDiscovery: Send + Sync {
    /// Resolve `http://<host>:<port>` to a connectable WebSocket URL.
    async fn resolve(&self, base_url: &str) -> Result<String, DiscoveryError>;
}

/// Retry [`InspectorDiscovery::resolve`] until it succeeds, the attempts run
/// out, or `cancel` fires.
pub async fn resolve_with_retry(
    discovery: &dyn InspectorDiscovery,
    base_url: &str,
    attempts: u32,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<String, DiscoveryError> {
    let mut last_reason = String::from("no attempts made");
    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }
        match discovery.resolve(base_url).await {
            Ok(url) => return Ok(url),
            Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
            Err(DiscoveryError::Unreachable { reason, .. }) => {
                debug!(attempt, reason, "inspector not ready yet");
                last_reason = reason;
            }
        }
        tokio::select! {
            () = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
            () = tokio::time::sleep(interval) => {}
        }
    }
    Err(DiscoveryError::Unreachable {
        base: base_url.to_owned(),
        reason: last_reason,
    })
}
