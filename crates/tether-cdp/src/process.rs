//! Result vocabulary of message processing.
//!
//! Handlers are pure: they take a message plus session state and return a
//! [`ProcessedMessage`] describing what the relay should do with it. All
//! socket writes, including messages the handler synthesized itself, are
//! performed by the relay.

use crate::message::ProtocolMessage;

/// Where a processed message must be sent.
///
/// Exactly one of the three applies to every processed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchDirection {
    /// Send to the peer on the other side of the relay.
    Forward,
    /// Send back to the side the message came from.
    Back,
    /// Drop the message entirely.
    Cancel,
}

/// The two sides of the relay a synthesized message can be addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Peer {
    /// The debugging client.
    Debugger,
    /// The application's inspector endpoint.
    Application,
}

/// A message the handler created itself (not a rewrite of inbound traffic),
/// with the side it must be delivered to.
#[derive(Clone, Debug, PartialEq)]
pub struct Synthesized {
    /// The message to send.
    pub payload: ProtocolMessage,
    /// Which side receives it.
    pub destination: Peer,
}

/// Outcome of processing one inbound message.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedMessage {
    /// The (possibly rewritten) message.
    pub event: ProtocolMessage,
    /// Where the message goes.
    pub direction: DispatchDirection,
    /// One-shot readiness signal: the application side has reached a state
    /// from which two-way communication is valid. Meaningful only the first
    /// time it is observed `true`.
    pub communication_preparations_done: bool,
    /// Messages the handler synthesized as a side effect, delivered by the
    /// relay in order before `event` is dispatched.
    pub synthesized: Vec<Synthesized>,
}

impl ProcessedMessage {
    /// Forward the message to the other side.
    pub fn forward(event: ProtocolMessage) -> Self {
        Self::with_direction(event, DispatchDirection::Forward)
    }

    /// Send the message back to its sender.
    pub fn back(event: ProtocolMessage) -> Self {
        Self::with_direction(event, DispatchDirection::Back)
    }

    /// Drop the message.
    pub fn cancel(event: ProtocolMessage) -> Self {
        Self::with_direction(event, DispatchDirection::Cancel)
    }

    fn with_direction(event: ProtocolMessage, direction: DispatchDirection) -> Self {
        Self {
            event,
            direction,
            communication_preparations_done: false,
            synthesized: Vec::new(),
        }
    }

    /// Mark the one-shot readiness signal.
    #[must_use]
    pub fn ready(mut self) -> Self {
        self.communication_preparations_done = true;
        self
    }

    /// Attach a synthesized message addressed to `destination`.
    #[must_use]
    pub fn with_synthesized(mut self, payload: ProtocolMessage, destination: Peer) -> Self {
        self.synthesized.push(Synthesized {
            payload,
            destination,
        });
        self
    }
}
