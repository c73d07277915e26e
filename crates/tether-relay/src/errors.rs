//! Relay error type.

use std::time::Duration;

use thiserror::Error;

use crate::discovery::DiscoveryError;

/// Errors surfaced by the relay.
///
/// Only the fatal variants end the session; per-message handler errors are
/// logged at the pump and never reach the owner.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The application never signaled readiness within the handshake window.
    #[error("application gave no readiness signal within {0:?}")]
    HandshakeTimeout(Duration),

    /// The application inspector endpoint could not be discovered.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Opening the application WebSocket failed.
    #[error("failed to open application connection to {url}: {reason}")]
    ApplicationConnect {
        /// Endpoint the connection was attempted against.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// A synthesized message required by session setup could not be
    /// delivered to the debugger.
    #[error("debugger connection rejected a setup message")]
    SetupDeliveryFailed,

    /// A session was started before `configure_handler` was called.
    #[error("no message handler configured for this session")]
    HandlerNotConfigured,

    /// A required piece of lifecycle configuration is missing.
    #[error("relay is not configured: missing {0}")]
    NotConfigured(&'static str),

    /// Binding or serving the debugger-facing listener failed.
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}
