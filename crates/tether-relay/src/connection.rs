//! Channel-backed connection handles and socket I/O tasks.
//!
//! Each live socket is reduced to the same shape regardless of transport:
//! an [`OutboundSender`] for writes, and inbound frames tagged with their
//! [`Endpoint`] flowing into the session's single inbound channel. The pump
//! therefore processes all four event streams strictly sequentially, which
//! is what keeps handler state lock-free in practice.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Buffered outbound frames per connection.
const OUTBOUND_BUFFER: usize = 1024;

/// The three sockets a session can own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// The debugging client.
    Debugger,
    /// The application's inspector endpoint.
    Application,
    /// The page-specific endpoint used in simulate mode.
    SimulatePage,
}

/// One inbound frame, tagged with the socket it arrived on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
    /// Which socket produced the frame.
    pub endpoint: Endpoint,
    /// The frame itself.
    pub frame: Frame,
}

/// What a socket produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A text (or UTF-8 binary) protocol frame.
    Text(String),
    /// The socket ended.
    Closed,
}

/// Write half of a connection, owned exclusively by the relay.
///
/// Dropping the sender ends the connection's write task.
#[derive(Clone, Debug)]
pub struct OutboundSender {
    tx: mpsc::Sender<String>,
}

impl OutboundSender {
    /// Wrap a raw channel sender.
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Enqueue a frame for the socket's write task.
    ///
    /// Returns `false` when the connection is gone.
    pub async fn send(&self, text: String) -> bool {
        self.tx.send(text).await.is_ok()
    }
}

/// Spawn read/write tasks for an upgraded debugger-facing WebSocket.
///
/// Inbound text (and UTF-8 binary) frames are forwarded into `inbound`; the
/// returned sender feeds the write task. Transport errors are logged and do
/// not end the session by themselves — only the socket ending does.
pub fn spawn_debugger_io(
    socket: axum::extract::ws::WebSocket,
    inbound: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) -> OutboundSender {
    use axum::extract::ws::Message;

    let (mut sink, mut source) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    drop(tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    }));

    drop(tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                frame = source.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text.to_string(),
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                            Ok(text) => text,
                            Err(_) => {
                                debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                                continue;
                            }
                        },
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                        Some(Ok(Message::Close(_))) | None => {
                            let _ = inbound
                                .send(Inbound { endpoint: Endpoint::Debugger, frame: Frame::Closed })
                                .await;
                            break;
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "debugger socket transport error");
                            continue;
                        }
                    };
                    if inbound
                        .send(Inbound { endpoint: Endpoint::Debugger, frame: Frame::Text(text) })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
    }));

    OutboundSender::new(tx)
}

/// Spawn read/write tasks for an application-side WebSocket.
pub fn spawn_application_io<S>(
    stream: tokio_tungstenite::WebSocketStream<S>,
    endpoint: Endpoint,
    inbound: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) -> OutboundSender
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    use tokio_tungstenite::tungstenite::Message;

    let (mut sink, mut source) = stream.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    drop(tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    }));

    drop(tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                frame = source.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text.to_string(),
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                            Ok(text) => text,
                            Err(_) => {
                                debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                                continue;
                            }
                        },
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            warn!(error = %err, ?endpoint, "application socket transport error");
                            continue;
                        }
                        None => {
                            let _ = inbound.send(Inbound { endpoint, frame: Frame::Closed }).await;
                            break;
                        }
                    };
                    if inbound
                        .send(Inbound { endpoint, frame: Frame::Text(text) })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
    }));

    OutboundSender::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outbound_sender_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = OutboundSender::new(tx);
        assert!(sender.send("first".into()).await);
        assert!(sender.send("second".into()).await);
        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn outbound_sender_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let sender = OutboundSender::new(tx);
        assert!(!sender.send("lost".into()).await);
    }
}
