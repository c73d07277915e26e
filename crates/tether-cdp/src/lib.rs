//! # tether-cdp
//!
//! Protocol vocabulary shared by the Tether debug bridge crates.
//!
//! This crate provides:
//! - **Message model**: [`ProtocolMessage`], an untyped view over a CDP JSON
//!   envelope (`id`/`method`/`params`/`result`/`error`) with kind
//!   classification
//! - **Dispatch types**: [`DispatchDirection`], [`ProcessedMessage`], and
//!   [`Synthesized`] — the result vocabulary of message processing
//! - **Target envelope**: wrap/unwrap helpers for the WebKit remote-inspector
//!   dialect that tunnels every message through `Target.sendMessageToTarget`
//!   / `Target.dispatchMessageFromTarget`
//! - **Version gate**: [`targeted_dialect`], deciding whether a device's
//!   inspector requires the Target envelope

#![deny(unsafe_code)]

pub mod errors;
pub mod message;
pub mod process;
pub mod target;
pub mod version;

pub use errors::CdpError;
pub use message::{MessageKind, ProtocolMessage};
pub use process::{DispatchDirection, Peer, ProcessedMessage, Synthesized};
pub use target::{is_target_domain, unwrap_from_target, wrap_for_target};
pub use version::targeted_dialect;
