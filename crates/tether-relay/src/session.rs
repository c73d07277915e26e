//! The per-session message pump and state machine.
//!
//! All processing is strictly sequential: the pump runs on one task, pulls
//! tagged frames off a single inbound channel, and finishes each message
//! before touching the next. Cross-socket ordering is enforced only through
//! the pause gate — nothing reaches the debugger before the first
//! `communication_preparations_done`, and debugger traffic queues unprocessed
//! until then.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tether_cdp::{DispatchDirection, Peer, ProcessedMessage, ProtocolMessage};
use tether_handlers::handler::CLOSE_METHOD;
use tether_handlers::DialectHandler;

use crate::connection::{Endpoint, Frame, Inbound, OutboundSender};
use crate::connector::{ApplicationConnector, ApplicationLinks};
use crate::errors::RelayError;

/// How long the debugger may stay paused before the session fails.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(6);

/// Inbound channel depth shared by all sockets of a session.
pub(crate) const INBOUND_BUFFER: usize = 1024;

/// Commands that must be serviced by the page-specific endpoint in simulate
/// mode; the general browser endpoint cannot answer them.
const SIMULATE_PAGE_DOMAIN: &str = "Emulation.";

/// Session lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayState {
    /// Session object exists, nothing connected yet.
    Created,
    /// Debugger accepted, application endpoint being resolved.
    AwaitingApplicationConnection,
    /// Both sides connected, debugger gated.
    Paused,
    /// Readiness observed, gate lifted.
    Unpaused,
    /// Normal relaying.
    Active,
    /// Handshake timed out or setup failed fatally.
    Failed,
    /// Torn down.
    Closed,
}

/// Events surfaced to the session owner.
#[derive(Debug)]
pub enum RelayEvent {
    /// A fatal error; the session is being torn down.
    Error(RelayError),
    /// The session ended.
    Closed,
}

/// Shared slot holding the session's handler.
///
/// The pump is single-task, but `configure_handler` may be re-invoked from
/// outside (e.g. once the device's OS version becomes known), so access is
/// serialized with a mutex.
pub type SharedHandler = Arc<Mutex<Option<DialectHandler>>>;

/// Connection handles owned by the session. Acquire/release happens only
/// here; handlers never see these.
#[derive(Default)]
struct Connections {
    debugger: Option<OutboundSender>,
    application: Option<OutboundSender>,
    simulate_page: Option<OutboundSender>,
}

/// One relay session: the pump between a debugger connection and the
/// application's inspector.
pub struct RelaySession {
    handler: SharedHandler,
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
    connections: Connections,
    events_tx: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
    state: RelayState,
    /// Debugger frames received while paused, drained in order on unpause.
    pending_from_debugger: VecDeque<String>,
    /// Debugger-bound frames produced while paused.
    pending_to_debugger: VecDeque<String>,
    fatal_emitted: bool,
}

impl RelaySession {
    /// Create a session. The debugger connection is attached separately with
    /// [`Self::attach_debugger`] once its socket I/O exists.
    pub fn new(
        handler: SharedHandler,
        events_tx: mpsc::Sender<RelayEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        Self {
            handler,
            inbound_tx,
            inbound_rx,
            connections: Connections::default(),
            events_tx,
            cancel,
            state: RelayState::Created,
            pending_from_debugger: VecDeque::new(),
            pending_to_debugger: VecDeque::new(),
            fatal_emitted: false,
        }
    }

    /// The sender all socket read tasks feed their frames into.
    pub fn inbound_sender(&self) -> mpsc::Sender<Inbound> {
        self.inbound_tx.clone()
    }

    /// Adopt the accepted debugger connection.
    pub fn attach_debugger(&mut self, sender: OutboundSender) {
        self.connections.debugger = Some(sender);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RelayState {
        self.state
    }

    fn is_paused(&self) -> bool {
        matches!(
            self.state,
            RelayState::AwaitingApplicationConnection | RelayState::Paused
        )
    }

    /// Run the session to completion.
    ///
    /// The debugger is paused from the moment it is accepted; the handshake
    /// timer covers both opening the application connection and waiting for
    /// the readiness signal.
    #[instrument(skip_all)]
    pub async fn run(mut self, connector: &dyn ApplicationConnector) {
        self.state = RelayState::AwaitingApplicationConnection;
        let handshake = tokio::time::sleep(HANDSHAKE_TIMEOUT);
        tokio::pin!(handshake);

        let links = tokio::select! {
            () = self.cancel.cancelled() => {
                self.close().await;
                return;
            }
            () = &mut handshake => {
                self.fail(RelayError::HandshakeTimeout(HANDSHAKE_TIMEOUT)).await;
                return;
            }
            links = connector.connect(self.inbound_tx.clone(), self.cancel.clone()) => match links {
                Ok(links) => links,
                Err(err) => {
                    self.fail(err).await;
                    return;
                }
            }
        };
        self.adopt_links(links);
        self.state = RelayState::Paused;

        // Dialects without a target handshake are ready as soon as the
        // application connection opens.
        let ready = self
            .handler
            .lock()
            .as_ref()
            .is_some_and(DialectHandler::ready_when_connected);
        if ready {
            self.unpause().await;
        }

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = &mut handshake, if self.is_paused() => {
                    self.fail(RelayError::HandshakeTimeout(HANDSHAKE_TIMEOUT)).await;
                    return;
                }
                inbound = self.inbound_rx.recv() => {
                    let Some(Inbound { endpoint, frame }) = inbound else { break };
                    match frame {
                        Frame::Text(text) => {
                            if !self.on_text(endpoint, text).await {
                                return;
                            }
                        }
                        Frame::Closed => {
                            self.on_closed(endpoint);
                            break;
                        }
                    }
                }
            }
        }
        self.close().await;
    }

    fn adopt_links(&mut self, links: ApplicationLinks) {
        self.connections.application = Some(links.application);
        self.connections.simulate_page = links.simulate_page;
    }

    /// Process one text frame. Returns `false` when the session failed
    /// fatally and teardown already ran.
    async fn on_text(&mut self, endpoint: Endpoint, text: String) -> bool {
        match endpoint {
            Endpoint::Debugger if self.is_paused() => {
                self.pending_from_debugger.push_back(text);
                true
            }
            Endpoint::Debugger => self.process_debugger_text(text).await,
            Endpoint::Application | Endpoint::SimulatePage => {
                self.process_application_text(endpoint, text).await
            }
        }
    }

    async fn process_debugger_text(&mut self, text: String) -> bool {
        let message = match ProtocolMessage::parse(&text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "dropping unparseable debugger frame");
                return true;
            }
        };
        let processed = {
            let mut slot = self.handler.lock();
            let Some(handler) = slot.as_mut() else {
                warn!("no handler configured; dropping debugger frame");
                return true;
            };
            handler.process_debugger_message(message)
        };
        let processed = match processed {
            Ok(processed) => processed,
            Err(err) => {
                warn!(error = %err, "handler rejected debugger message");
                return true;
            }
        };
        self.dispatch(Endpoint::Debugger, processed).await
    }

    async fn process_application_text(&mut self, endpoint: Endpoint, text: String) -> bool {
        let message = match ProtocolMessage::parse(&text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, ?endpoint, "dropping unparseable application frame");
                return true;
            }
        };
        let processed = {
            let mut slot = self.handler.lock();
            let Some(handler) = slot.as_mut() else {
                warn!("no handler configured; dropping application frame");
                return true;
            };
            handler.process_application_message(message)
        };
        let processed = match processed {
            Ok(processed) => processed,
            Err(err) => {
                warn!(error = %err, "handler rejected application message");
                return true;
            }
        };

        if processed.communication_preparations_done && self.is_paused() {
            self.unpause().await;
        }
        self.dispatch(endpoint, processed).await
    }

    /// Deliver synthesized messages, then the processed message itself.
    async fn dispatch(&mut self, origin: Endpoint, processed: ProcessedMessage) -> bool {
        let ProcessedMessage {
            event,
            direction,
            synthesized,
            ..
        } = processed;

        for synth in synthesized {
            let Ok(wire) = synth.payload.to_wire() else {
                continue;
            };
            match synth.destination {
                // Best-effort: bootstrap traffic toward the application must
                // never take the session down.
                Peer::Application => {
                    if !self.send_to_application(&synth.payload, wire).await {
                        warn!("failed to deliver synthesized application message");
                    }
                }
                // The debugger cannot proceed without its synthesized setup
                // events; losing one is fatal.
                Peer::Debugger => {
                    if !self.send_to_debugger(wire).await {
                        self.fail(RelayError::SetupDeliveryFailed).await;
                        return false;
                    }
                }
            }
        }

        let wire = match event.to_wire() {
            Ok(wire) => wire,
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound message");
                return true;
            }
        };
        match direction {
            DispatchDirection::Cancel => {}
            DispatchDirection::Forward => match origin {
                Endpoint::Debugger => {
                    if !self.send_to_application(&event, wire).await {
                        debug!("application connection gone; dropping forwarded message");
                    }
                }
                Endpoint::Application | Endpoint::SimulatePage => {
                    if !self.send_to_debugger(wire).await {
                        debug!("debugger connection gone; dropping forwarded message");
                    }
                }
            },
            DispatchDirection::Back => {
                let sender = match origin {
                    Endpoint::Debugger => self.connections.debugger.clone(),
                    Endpoint::Application => self.connections.application.clone(),
                    Endpoint::SimulatePage => self.connections.simulate_page.clone(),
                };
                if let Some(sender) = sender {
                    let _ = sender.send(wire).await;
                }
            }
        }
        true
    }

    /// Send toward the application side, routing emulation-domain commands
    /// to the page-specific endpoint when simulate mode is active.
    async fn send_to_application(&self, event: &ProtocolMessage, wire: String) -> bool {
        let use_simulate_page = self.connections.simulate_page.is_some()
            && event
                .method()
                .is_some_and(|m| m.starts_with(SIMULATE_PAGE_DOMAIN));
        let sender = if use_simulate_page {
            self.connections.simulate_page.as_ref()
        } else {
            self.connections.application.as_ref()
        };
        match sender {
            Some(sender) => sender.send(wire).await,
            None => false,
        }
    }

    async fn send_to_debugger(&mut self, wire: String) -> bool {
        if self.is_paused() {
            self.pending_to_debugger.push_back(wire);
            return true;
        }
        match self.connections.debugger.as_ref() {
            Some(sender) => sender.send(wire).await,
            None => false,
        }
    }

    /// Lift the pause gate: flush debugger-bound output, then run the queued
    /// debugger frames through normal processing, in arrival order.
    async fn unpause(&mut self) {
        if !self.is_paused() {
            return;
        }
        info!("communication preparations done; unpausing debugger");
        self.state = RelayState::Unpaused;

        while let Some(wire) = self.pending_to_debugger.pop_front() {
            if let Some(sender) = self.connections.debugger.as_ref() {
                let _ = sender.send(wire).await;
            }
        }
        while let Some(text) = self.pending_from_debugger.pop_front() {
            if !self.process_debugger_text(text).await {
                return;
            }
        }
        if self.state == RelayState::Unpaused {
            self.state = RelayState::Active;
        }
    }

    fn on_closed(&mut self, endpoint: Endpoint) {
        debug!(?endpoint, "connection ended");
        if endpoint == Endpoint::Debugger {
            // Let the handler reset its one-shot flags before teardown so a
            // reconnecting client bootstraps again.
            let close = ProtocolMessage::from_value(serde_json::json!({ "method": CLOSE_METHOD }));
            if let Some(handler) = self.handler.lock().as_mut() {
                let _ = handler.process_debugger_message(close);
            }
        }
    }

    async fn fail(&mut self, error: RelayError) {
        if !self.fatal_emitted {
            self.fatal_emitted = true;
            warn!(error = %error, "session failed");
            let _ = self.events_tx.send(RelayEvent::Error(error)).await;
        }
        self.state = RelayState::Failed;
        self.close().await;
    }

    /// Tear the session down. Safe to reach from any state: connections are
    /// nulled without re-closing, and the closed event fires once.
    async fn close(&mut self) {
        if self.state == RelayState::Closed {
            return;
        }
        self.state = RelayState::Closed;
        self.connections.debugger = None;
        self.connections.application = None;
        self.connections.simulate_page = None;
        self.cancel.cancel();
        let _ = self.events_tx.send(RelayEvent::Closed).await;
        info!("session closed");
    }
}

#[cfg(test)]
mod tests {
    // Pump behavior (pause gate, handshake timeout, ordering across
    // unpause) needs both relay sides wired up and is covered by the
    // integration tests in tests/session.rs. Unit tests here validate
    // construction basics.

    use super::*;

    fn empty_handler() -> SharedHandler {
        Arc::new(Mutex::new(None))
    }

    #[tokio::test]
    async fn new_session_starts_created() {
        let (events_tx, _events_rx) = mpsc::channel(4);
        let session = RelaySession::new(empty_handler(), events_tx, CancellationToken::new());
        assert_eq!(session.state(), RelayState::Created);
    }

    #[tokio::test]
    async fn inbound_sender_feeds_the_session_channel() {
        let (events_tx, _events_rx) = mpsc::channel(4);
        let mut session = RelaySession::new(empty_handler(), events_tx, CancellationToken::new());
        session
            .inbound_sender()
            .send(Inbound {
                endpoint: Endpoint::Debugger,
                frame: Frame::Text("{}".into()),
            })
            .await
            .unwrap();
        let received = session.inbound_rx.recv().await.unwrap();
        assert_eq!(received.endpoint, Endpoint::Debugger);
    }

    #[tokio::test]
    async fn cancelled_session_closes_with_one_event() {
        let (events_tx, mut events_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut session = RelaySession::new(empty_handler(), events_tx, cancel);
        let (debugger_tx, _debugger_rx) = mpsc::channel(4);
        session.attach_debugger(OutboundSender::new(debugger_tx));

        struct Pending;
        #[async_trait::async_trait]
        impl ApplicationConnector for Pending {
            async fn connect(
                &self,
                _inbound: mpsc::Sender<Inbound>,
                _cancel: CancellationToken,
            ) -> Result<ApplicationLinks, RelayError> {
                std::future::pending().await
            }
        }

        session.run(&Pending).await;
        assert!(matches!(events_rx.recv().await, Some(RelayEvent::Closed)));
        assert!(events_rx.recv().await.is_none());
    }
}
