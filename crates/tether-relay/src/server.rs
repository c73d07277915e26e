//! Debugger-facing WebSocket listener and the relay lifecycle API.
//!
//! The server accepts exactly one debugging client at a time; a session
//! lives from upgrade to disconnect. Lifecycle configuration
//! (`set_application_port`, `set_inspector_url`, `configure_handler`) may be
//! adjusted at any point — `configure_handler` in particular is re-invoked
//! once the device's OS version becomes known.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tether_handlers::options::ProjectKind;
use tether_handlers::{handler_for_session, DialectHandler, HandlerOptions};
use tether_paths::PathTransformer;

use crate::connection::spawn_debugger_io;
use crate::connector::WsApplicationConnector;
use crate::discovery::InspectorDiscovery;
use crate::errors::RelayError;
use crate::session::{RelayEvent, RelaySession, SharedHandler};

/// Listener configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
        }
    }
}

/// Configuration and collaborators shared between the lifecycle API and the
/// running session.
pub struct RelayShared {
    application_port: Mutex<Option<u16>>,
    inspector_url: Mutex<Option<String>>,
    simulate_port: Mutex<Option<u16>>,
    handler: SharedHandler,
    discovery: Arc<dyn InspectorDiscovery>,
    events_tx: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
    session_active: AtomicBool,
}

impl RelayShared {
    /// The configured application debug port, if any.
    pub fn application_port(&self) -> Option<u16> {
        *self.application_port.lock()
    }

    /// The explicitly configured inspector URL, if any.
    pub fn inspector_url(&self) -> Option<String> {
        self.inspector_url.lock().clone()
    }

    /// The simulate server port, if simulate mode is active.
    pub fn simulate_port(&self) -> Option<u16> {
        *self.simulate_port.lock()
    }

    /// The discovery collaborator.
    pub fn discovery(&self) -> Arc<dyn InspectorDiscovery> {
        self.discovery.clone()
    }
}

/// The CDP relay server: one listener, at most one session at a time.
pub struct CdpRelayServer {
    config: RelayConfig,
    shared: Arc<RelayShared>,
}

impl CdpRelayServer {
    /// Create a relay server. Returns the server and the receiver for fatal
    /// error / closed events.
    pub fn new(
        config: RelayConfig,
        discovery: Arc<dyn InspectorDiscovery>,
    ) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (events_tx, events_rx) = mpsc::channel(16);
        let shared = Arc::new(RelayShared {
            application_port: Mutex::new(None),
            inspector_url: Mutex::new(None),
            simulate_port: Mutex::new(None),
            handler: Arc::new(Mutex::new(None)),
            discovery,
            events_tx,
            cancel: CancellationToken::new(),
            session_active: AtomicBool::new(false),
        });
        (Self { config, shared }, events_rx)
    }

    /// Set the HTTP port the application's inspector listing is polled on.
    pub fn set_application_port(&self, port: u16) {
        *self.shared.application_port.lock() = Some(port);
    }

    /// Set the inspector WebSocket URL directly, bypassing discovery.
    pub fn set_inspector_url(&self, url: impl Into<String>) {
        *self.shared.inspector_url.lock() = Some(url.into());
    }

    /// Configure (or reconfigure) the session handler from options.
    ///
    /// Safe to call while a session is running; the next processed message
    /// uses the new handler.
    pub fn configure_handler(
        &self,
        options: HandlerOptions,
        project: ProjectKind,
        paths: PathTransformer,
    ) {
        *self.shared.simulate_port.lock() = options.simulate_port;
        let handler = handler_for_session(options, project, paths);
        self.install_handler(handler);
    }

    /// Install an already-built handler (used by tests and custom wiring).
    pub fn install_handler(&self, handler: DialectHandler) {
        *self.shared.handler.lock() = Some(handler);
    }

    /// Bind the listener and start accepting debugger connections.
    ///
    /// Returns the bound address. The server runs until [`Self::stop`].
    pub async fn listen(&self) -> Result<SocketAddr, RelayError> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;

        let router = Router::new()
            .fallback(ws_upgrade)
            .with_state(self.shared.clone());
        let cancel = self.shared.cancel.clone();
        drop(tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(cancel.cancelled_owned());
            if let Err(err) = serve.await {
                warn!(error = %err, "relay listener ended with error");
            }
        }));

        info!(%addr, "relay listening for debugger connections");
        Ok(addr)
    }

    /// Stop the server and any running session. Idempotent: calling it on an
    /// already-stopped relay is a no-op.
    pub fn stop(&self) {
        self.shared.cancel.cancel();
    }
}

/// Accept a debugger WebSocket on any path (clients differ in what they
/// append to the endpoint).
async fn ws_upgrade(State(shared): State<Arc<RelayShared>>, ws: WebSocketUpgrade) -> Response {
    if shared.handler.lock().is_none() {
        warn!("rejecting debugger connection: no handler configured");
        return (StatusCode::CONFLICT, "relay not configured").into_response();
    }
    if shared.session_active.swap(true, Ordering::SeqCst) {
        warn!("rejecting debugger connection: session already active");
        return (StatusCode::CONFLICT, "debugger already attached").into_response();
    }
    ws.on_upgrade(move |socket| run_debugger_session(shared, socket))
}

async fn run_debugger_session(shared: Arc<RelayShared>, socket: WebSocket) {
    info!("debugger connected; pausing until the application side is ready");
    let session_cancel = shared.cancel.child_token();

    let mut session = RelaySession::new(
        shared.handler.clone(),
        shared.events_tx.clone(),
        session_cancel.clone(),
    );
    let debugger = spawn_debugger_io(socket, session.inbound_sender(), session_cancel);
    session.attach_debugger(debugger);

    let connector = WsApplicationConnector::new(shared.clone());
    session.run(&connector).await;
    shared.session_active.store(false, Ordering::SeqCst);
    info!("debugger session finished");
}
