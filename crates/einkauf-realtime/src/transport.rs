//! Transport seam between the state machine and the wire.
//!
//! The connection manager never touches a WebSocket directly; it speaks to
//! a [`Socket`] — an mpsc command sender plus an mpsc event receiver —
//! produced by a [`Transport`]. Production code installs [`WsTransport`]
//! (tokio-tungstenite); tests install channel-backed doubles.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::trace;

use einkauf_core::RealtimeError;
use einkauf_core::constants::ABNORMAL_CLOSURE_CODE;

/// Outbound command channel depth. Sized to absorb a full default queue
/// drain plus heartbeat traffic without blocking.
const COMMAND_BUFFER: usize = 256;

/// Inbound event channel depth.
const EVENT_BUFFER: usize = 64;

/// Commands the manager issues to a live socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketCommand {
    /// Transmit a serialized text frame.
    Send(String),
    /// Close the socket with the given status code and reason.
    Close {
        /// Wire-protocol close status code.
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Raw events a live socket feeds back to the manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    /// A text frame arrived.
    Message(String),
    /// A transport-level error occurred. Does not itself end the stream;
    /// a `Closed` event follows.
    Error(String),
    /// The socket closed. Always the final event on the stream.
    Closed {
        /// Wire-protocol close status code (1006 when the peer vanished
        /// without a close handshake).
        code: u16,
        /// Close reason supplied by whichever side initiated the close.
        reason: String,
    },
}

/// A connected socket: the write half as a command sender, the read half
/// as an event receiver.
#[derive(Debug)]
pub struct Socket {
    /// Outbound command channel into the socket's writer.
    pub commands: mpsc::Sender<SocketCommand>,
    /// Inbound events from the socket's reader.
    pub events: mpsc::Receiver<SocketEvent>,
}

/// Something that can dial the realtime endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `url` and return the connected socket halves.
    ///
    /// Contract: the returned event stream terminates with exactly one
    /// [`SocketEvent::Closed`], whether the close was local, remote, or a
    /// transport failure.
    async fn dial(&self, url: &str) -> Result<Socket, RealtimeError>;

    /// Whether this transport is usable in the current environment.
    fn is_supported(&self) -> bool {
        true
    }
}

/// Production transport over `tokio-tungstenite`.
///
/// The WebSocket is split into a writer task (draining [`SocketCommand`]s
/// into the sink) and a reader task (pumping frames into [`SocketEvent`]s).
/// Protocol-level ping/pong frames are handled by tungstenite itself and
/// never surface here.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn dial(&self, url: &str) -> Result<Socket, RealtimeError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| RealtimeError::ConnectFailed(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<SocketCommand>(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel::<SocketEvent>(EVENT_BUFFER);

        // Writer task: forward commands into the sink. A local close is
        // reported on the event stream immediately; the reader's copy of
        // the sender is dropped unread after the manager sees the first
        // `Closed`.
        let writer_events = event_tx.clone();
        let _writer = tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    SocketCommand::Send(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    SocketCommand::Close { code, reason } => {
                        trace!(code, reason, "closing socket");
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.clone().into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        let _ = writer_events
                            .send(SocketEvent::Closed { code, reason })
                            .await;
                        break;
                    }
                }
            }
        });

        // Reader task: pump frames into events until the stream ends.
        let _reader = tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(Message::Text(text)) => {
                        if event_tx
                            .send(SocketEvent::Message(text.as_str().to_owned()))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                            .unwrap_or((ABNORMAL_CLOSURE_CODE, String::new()));
                        let _ = event_tx.send(SocketEvent::Closed { code, reason }).await;
                        return;
                    }
                    // Protocol ping/pong is answered by tungstenite; binary
                    // frames are not part of this protocol.
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(SocketEvent::Error(e.to_string())).await;
                        let _ = event_tx
                            .send(SocketEvent::Closed {
                                code: ABNORMAL_CLOSURE_CODE,
                                reason: "transport error".into(),
                            })
                            .await;
                        return;
                    }
                }
            }
            // Stream ended without a close handshake.
            let _ = event_tx
                .send(SocketEvent::Closed {
                    code: ABNORMAL_CLOSURE_CODE,
                    reason: String::new(),
                })
                .await;
        });

        Ok(Socket {
            commands: cmd_tx,
            events: event_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_transport_is_supported() {
        assert!(WsTransport.is_supported());
    }

    #[test]
    fn socket_command_equality() {
        assert_eq!(
            SocketCommand::Send("a".into()),
            SocketCommand::Send("a".into())
        );
        assert_ne!(
            SocketCommand::Send("a".into()),
            SocketCommand::Close {
                code: 1000,
                reason: "a".into()
            }
        );
    }

    #[test]
    fn socket_event_debug() {
        let ev = SocketEvent::Closed {
            code: 1006,
            reason: String::new(),
        };
        assert!(format!("{ev:?}").contains("1006"));
    }

    #[tokio::test]
    async fn dial_to_unreachable_endpoint_fails() {
        // Port 1 is essentially never listening.
        let result = WsTransport.dial("ws://127.0.0.1:1/ws/token").await;
        assert!(matches!(result, Err(RealtimeError::ConnectFailed(_))));
    }
}
