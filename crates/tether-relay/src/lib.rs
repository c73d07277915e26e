//! # tether-relay
//!
//! The CDP relay at the heart of the Tether debug bridge.
//!
//! One relay exists per debugging session. It exclusively owns the
//! debugger-facing connection, the application-facing connection, and (in
//! simulate mode) a third page-specific connection; no other component ever
//! stores a connection handle. Every inbound message is run through the
//! session's dialect handler, and the returned dispatch decision selects the
//! outgoing socket.
//!
//! The session state machine:
//!
//! ```text
//! Created -> AwaitingApplicationConnection -> Paused
//! Paused -> Unpaused            [first communication_preparations_done]
//! Paused -> Failed              [handshake timer elapses]
//! Unpaused -> Active
//! Active -> Closed              [either connection ends, or stop()]
//! ```
//!
//! Modules:
//! - [`connection`]: channel-backed connection handles and socket I/O tasks
//! - [`discovery`]: the inspector-discovery collaborator interface
//! - [`connector`]: application-side connection establishment
//! - [`session`]: the message pump and state machine
//! - [`server`]: the debugger-facing WebSocket listener and lifecycle API

#![deny(unsafe_code)]

pub mod connection;
pub mod connector;
pub mod discovery;
pub mod errors;
pub mod server;
pub mod session;

pub use connection::{Endpoint, Frame, Inbound, OutboundSender};
pub use connector::{ApplicationConnector, ApplicationLinks};
pub use discovery::{resolve_with_retry, DiscoveryError, InspectorDiscovery};
pub use errors::RelayError;
pub use server::{CdpRelayServer, RelayConfig};
pub use session::{RelayEvent, RelaySession, RelayState, HANDSHAKE_TIMEOUT};
