//! The closed handler sum type and its dispatch table.
//!
//! One handler instance exists per debugging session. Both processing
//! functions are total over the four variants; adding a dialect means adding
//! a variant and the compiler walks every dispatch site.

use tether_cdp::{targeted_dialect, ProcessedMessage, ProtocolMessage};
use tether_paths::PathTransformer;

use crate::chromium;
use crate::errors::HandlerError;
use crate::options::{EngineKind, HandlerOptions};
use crate::state::HandlerState;
use crate::webkit;

/// Synthetic method the relay feeds to the handler when the debugger
/// connection ends, so one-shot bootstrap flags reset before a reconnect.
pub const CLOSE_METHOD: &str = "close";

/// Everything a handler owns for one session: immutable options, the mutable
/// state record, and the path transformer built from the project layout.
///
/// Connections are deliberately absent — handlers describe sends, the relay
/// performs them.
#[derive(Clone, Debug)]
pub struct SessionContext {
    /// Immutable session configuration.
    pub options: HandlerOptions,
    /// Mutable per-session state.
    pub state: HandlerState,
    /// Script URL → local path resolution.
    pub paths: PathTransformer,
}

impl SessionContext {
    /// Build a context for a session, fixing the dialect from the device's
    /// reported OS version. An unknown version is assumed to be current
    /// (targeted); `configure_handler` is re-invoked once the real version
    /// is known.
    pub fn new(options: HandlerOptions, paths: PathTransformer) -> Self {
        let is_targeted = options.engine_kind() == EngineKind::WebKit
            && options
                .ios_version
                .as_deref()
                .map_or(true, targeted_dialect);
        Self {
            state: HandlerState::new(is_targeted),
            options,
            paths,
        }
    }
}

/// The four per-(engine, project-kind) message handlers.
#[derive(Clone, Debug)]
pub enum DialectHandler {
    /// Chromium endpoint, bundled project.
    ChromiumPlain(SessionContext),
    /// Chromium endpoint, live-reload/framework project.
    ChromiumFramework(SessionContext),
    /// WebKit remote inspector, bundled project.
    WebKitPlain(SessionContext),
    /// WebKit remote inspector, live-reload/framework project.
    WebKitFramework(SessionContext),
}

impl DialectHandler {
    /// Process a message arriving from the debugging client.
    pub fn process_debugger_message(
        &mut self,
        message: ProtocolMessage,
    ) -> Result<ProcessedMessage, HandlerError> {
        if message.is_method(CLOSE_METHOD) {
            self.context_mut().state.reset_one_shot_flags();
            return Ok(ProcessedMessage::cancel(message));
        }
        match self {
            Self::ChromiumPlain(ctx) => chromium::process_debugger_message(ctx, false, message),
            Self::ChromiumFramework(ctx) => chromium::process_debugger_message(ctx, true, message),
            Self::WebKitPlain(ctx) => webkit::process_debugger_message(ctx, false, message),
            Self::WebKitFramework(ctx) => webkit::process_debugger_message(ctx, true, message),
        }
    }

    /// Process a message arriving from the application's inspector.
    pub fn process_application_message(
        &mut self,
        message: ProtocolMessage,
    ) -> Result<ProcessedMessage, HandlerError> {
        match self {
            Self::ChromiumPlain(ctx) => chromium::process_application_message(ctx, false, message),
            Self::ChromiumFramework(ctx) => {
                chromium::process_application_message(ctx, true, message)
            }
            Self::WebKitPlain(ctx) => webkit::process_application_message(ctx, false, message),
            Self::WebKitFramework(ctx) => webkit::process_application_message(ctx, true, message),
        }
    }

    /// Whether two-way communication is valid as soon as the application
    /// connection opens. Only the targeted WebKit dialect needs to wait for
    /// its target handshake.
    pub fn ready_when_connected(&self) -> bool {
        !self.context().state.is_targeted
    }

    /// Borrow the session context.
    pub fn context(&self) -> &SessionContext {
        match self {
            Self::ChromiumPlain(ctx)
            | Self::ChromiumFramework(ctx)
            | Self::WebKitPlain(ctx)
            | Self::WebKitFramework(ctx) => ctx,
        }
    }

    /// Mutable access to the session context.
    pub fn context_mut(&mut self) -> &mut SessionContext {
        match self {
            Self::ChromiumPlain(ctx)
            | Self::ChromiumFramework(ctx)
            | Self::WebKitPlain(ctx)
            | Self::WebKitFramework(ctx) => ctx,
        }
    }
}
