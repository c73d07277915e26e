//! Error type for protocol message handling.

use thiserror::Error;

/// Errors raised while parsing or re-shaping protocol messages.
///
/// These are per-message protocol errors: the relay logs them and skips the
/// offending message without ending the session.
#[derive(Debug, Error)]
pub enum CdpError {
    /// A frame or embedded payload was not valid JSON.
    #[error("invalid JSON in protocol message: {0}")]
    Parse(#[from] serde_json::Error),

    /// A `Target` envelope was missing a required field or had the wrong
    /// shape.
    #[error("malformed Target envelope: {0}")]
    Envelope(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_message_mentions_json() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err = CdpError::from(err);
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn envelope_error_carries_reason() {
        let err = CdpError::Envelope("missing `message` field");
        assert!(err.to_string().contains("missing `message` field"));
    }
}
