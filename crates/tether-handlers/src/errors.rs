//! Handler error type.

use thiserror::Error;

/// Errors raised while processing a single message.
///
/// A handler error affects only the message being processed; the relay logs
/// it and moves on to the next frame.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The message (or an embedded payload) could not be parsed or re-shaped.
    #[error(transparent)]
    Protocol(#[from] tether_cdp::CdpError),
}
