//! # tether-handlers
//!
//! Per-session CDP message handlers for the Tether debug bridge.
//!
//! Every debugging session speaks one of two inspector dialects (a
//! Chromium-style direct CDP endpoint, or the older WebKit remote-inspector
//! dialect that tunnels traffic through a `Target` envelope) against one of
//! two project shapes (a plain bundled project, or a live-reload/framework
//! project served straight from a dev server). That 2×2 space is modeled as
//! a closed sum type, [`DialectHandler`], dispatched through two table-driven
//! processing functions instead of an inheritance hierarchy:
//!
//! - [`options`]: immutable per-session configuration and the narrowing
//!   boundary from the full attach request
//! - [`state`]: the mutable per-session handler state record
//! - [`breakpoints`]: `setBreakpointByUrl` regex re-anchoring
//! - [`chromium`] / [`webkit`]: the dialect-specific rewrite rules
//! - [`selector`]: the pure (engine, project) → handler mapping

#![deny(unsafe_code)]

pub mod breakpoints;
pub mod chromium;
pub mod errors;
pub mod handler;
pub mod options;
pub mod scripts;
pub mod selector;
pub mod state;
pub mod webkit;

pub use errors::HandlerError;
pub use handler::{DialectHandler, SessionContext};
pub use options::{AttachRequest, EngineKind, HandlerOptions, ProjectKind, RequestKind};
pub use selector::{handler_for_session, select_variant, HandlerVariant};
pub use state::HandlerState;
