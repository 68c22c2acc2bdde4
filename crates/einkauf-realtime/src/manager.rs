//! Connection state machine and reconnect scheduling.
//!
//! [`ConnectionManager`] owns the authoritative [`ConnectionState`], the
//! single live socket handle, the outbound queue, and every timer
//! (handshake bound, heartbeat, reconnect). No other component mutates any
//! of these; consumers interact only through `connect` / `disconnect` /
//! `send` / `subscribe`.
//!
//! Every dial attempt carries a generation number and every reconnect
//! timer a schedule sequence; handlers verify theirs before touching
//! state, so a handler belonging to a superseded socket (or a timer that
//! lost a race with an intentional teardown) can never re-open or corrupt
//! the current connection.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use einkauf_core::constants::{ABNORMAL_CLOSURE_CODE, NORMAL_CLOSURE_CODE, PONG_TYPE};
use einkauf_core::events::{CONNECTION_CLOSE, CONNECTION_ERROR, CONNECTION_OPEN};
use einkauf_core::retry::reconnect_delay_ms;
use einkauf_core::{ClientMessage, RealtimeError, ServerMessage};

use crate::bus::{EventBus, Subscription};
use crate::config::RealtimeConfig;
use crate::heartbeat::run_heartbeat;
use crate::queue::OutboundQueue;
use crate::transport::{Socket, SocketCommand, SocketEvent, Transport};

/// Lifecycle state of the single logical connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket, no pending retry.
    Disconnected,
    /// A dial is in flight.
    Connecting,
    /// The socket is open and usable.
    Connected,
    /// A reconnect timer is armed after an abnormal close.
    Reconnecting,
}

/// Source of the current authentication credential.
///
/// Supplied by the host application; token issuance and refresh are out of
/// scope here. Implemented for any `Fn() -> Option<String>` closure.
pub trait TokenProvider: Send + Sync {
    /// The current valid token, or `None` when the user is not
    /// authenticated.
    fn current_token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_token(&self) -> Option<String> {
        self()
    }
}

/// Mutable state, guarded by one lock.
struct Inner {
    state: ConnectionState,
    /// Write half of the live socket; `None` unless a dial has completed.
    socket: Option<mpsc::Sender<SocketCommand>>,
    /// Consecutive failed/abnormal closes since the last successful open.
    attempts: u32,
    /// Bumped on every dial; handlers belonging to a superseded socket
    /// compare against it and bail.
    generation: u64,
    /// At most one armed reconnect timer, tagged with its schedule
    /// sequence so a fired-but-not-yet-run timer that lost a race with
    /// `disconnect()` or a manual `connect()` cannot dial.
    reconnect: Option<(u64, CancellationToken)>,
    reconnect_seq: u64,
    /// Cancels an in-flight dial and its handshake bound.
    dial_guard: Option<CancellationToken>,
    heartbeat: Option<CancellationToken>,
    queue: OutboundQueue,
}

/// Client-side manager for the single realtime connection.
///
/// Constructed once per process and shared behind an [`Arc`]; there is no
/// hidden global instance.
pub struct ConnectionManager {
    config: RealtimeConfig,
    tokens: Arc<dyn TokenProvider>,
    transport: Arc<dyn Transport>,
    bus: EventBus,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state.
    #[must_use]
    pub fn new(
        config: RealtimeConfig,
        tokens: Arc<dyn TokenProvider>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let queue = OutboundQueue::new(config.queue_capacity);
        Arc::new(Self {
            config,
            tokens,
            transport,
            bus: EventBus::new(),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                socket: None,
                attempts: 0,
                generation: 0,
                reconnect: None,
                reconnect_seq: 0,
                dial_guard: None,
                heartbeat: None,
                queue,
            }),
        })
    }

    // ─── Public surface ──────────────────────────────────────────────────

    /// Initiate a connection.
    ///
    /// Returns immediately after starting the handshake; completion is
    /// observable through the `connection:open` / `connection:close`
    /// categories. A call while already `Connecting` or `Connected` is a
    /// no-op, so duplicate sockets cannot exist.
    ///
    /// # Errors
    ///
    /// [`RealtimeError::NoCredentials`] when the token provider has no
    /// usable token. The connection stays `Disconnected`; the manager
    /// never retries this on its own.
    pub fn connect(self: &Arc<Self>) -> Result<(), RealtimeError> {
        let (generation, guard, url) = {
            let mut inner = self.inner.lock();
            if matches!(
                inner.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                trace!(state = ?inner.state, "connect ignored, already active");
                return Ok(());
            }

            // A dial from a previous attempt (and its handshake bound) is
            // superseded; so is any armed reconnect timer, since we are
            // about to dial anyway.
            if let Some(token) = inner.dial_guard.take() {
                token.cancel();
            }
            if let Some((_, token)) = inner.reconnect.take() {
                token.cancel();
            }

            let Some(token) = self.tokens.current_token().filter(|t| !t.is_empty()) else {
                inner.state = ConnectionState::Disconnected;
                return Err(RealtimeError::NoCredentials);
            };

            inner.state = ConnectionState::Connecting;
            inner.generation += 1;
            let guard = CancellationToken::new();
            inner.dial_guard = Some(guard.clone());
            (inner.generation, guard, self.config.endpoint_url(&token))
        };

        debug!(generation, "connecting");
        let manager = Arc::clone(self);
        let _ = tokio::spawn(async move {
            manager.run_dial(generation, url, guard).await;
        });
        Ok(())
    }

    /// Tear the connection down intentionally.
    ///
    /// Cancels the reconnect timer, the handshake bound, and the heartbeat
    /// as one atomic sequence, closes a live socket with the
    /// normal-closure code (1000) and `reason`, clears the outbound queue,
    /// and resets the attempt counter. This is the only path that
    /// guarantees no further automatic reconnection.
    pub fn disconnect(&self, reason: &str) {
        let socket = {
            let mut inner = self.inner.lock();
            if let Some((_, token)) = inner.reconnect.take() {
                token.cancel();
            }
            if let Some(token) = inner.dial_guard.take() {
                token.cancel();
            }
            if let Some(token) = inner.heartbeat.take() {
                token.cancel();
            }
            inner.state = ConnectionState::Disconnected;
            inner.attempts = 0;
            inner.queue.clear();
            inner.socket.take()
        };

        if let Some(tx) = socket {
            let _ = tx.try_send(SocketCommand::Close {
                code: NORMAL_CLOSURE_CODE,
                reason: reason.to_string(),
            });
        }
        debug!(reason, "disconnected");
    }

    /// Send a message, fire-and-forget.
    ///
    /// Transmits immediately when connected with a live socket; otherwise
    /// buffers the message in the outbound queue. A full queue drops the
    /// message and reports it on `connection:error`. Callers receive no
    /// delivery confirmation either way.
    pub fn send(&self, message: ClientMessage) {
        let overflow = {
            let mut inner = self.inner.lock();
            if inner.state == ConnectionState::Connected {
                if let Some(tx) = &inner.socket {
                    match serde_json::to_string(&message) {
                        Ok(frame) => {
                            if tx.try_send(SocketCommand::Send(frame)).is_ok() {
                                return;
                            }
                            // Writer gone or saturated; fall through to
                            // the queue like any other not-open state.
                        }
                        Err(e) => {
                            error!(kind = %message.kind, error = %e, "failed to serialize message");
                            return;
                        }
                    }
                }
            }
            match inner.queue.enqueue(message) {
                Ok(()) => None,
                Err(e) => Some(e),
            }
        };

        if let Some(e) = overflow {
            warn!(error = %e, "outbound queue full, dropping message");
            self.bus
                .publish(CONNECTION_ERROR, &json!({"message": e.to_string()}));
        }
    }

    /// Register a subscriber for an event category.
    pub fn subscribe(
        &self,
        category: &str,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(category, callback)
    }

    /// The event bus this manager publishes into.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Whether the connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether the underlying transport is usable in this environment.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.transport.is_supported()
    }

    /// Number of messages waiting in the outbound queue.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Consecutive failed attempts feeding the next backoff computation.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    // ─── Dial lifecycle ──────────────────────────────────────────────────

    /// Drive one dial attempt: race the transport against the handshake
    /// bound and the teardown guard.
    async fn run_dial(self: Arc<Self>, generation: u64, url: String, guard: CancellationToken) {
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        tokio::select! {
            result = self.transport.dial(&url) => match result {
                Ok(socket) => self.on_open(generation, socket),
                Err(e) => {
                    warn!(error = %e, "dial failed");
                    self.bus
                        .publish(CONNECTION_ERROR, &json!({"message": e.to_string()}));
                    self.on_close(generation, ABNORMAL_CLOSURE_CODE, "connect failed");
                }
            },
            () = guard.cancelled() => {
                trace!(generation, "dial superseded");
            }
            () = tokio::time::sleep(timeout) => {
                self.on_dial_timeout(generation, timeout);
            }
        }
    }

    /// Handshake exceeded its bound while still `Connecting`.
    ///
    /// Some environments silently block the handshake forever; retrying
    /// there is futile, so the attempt is abandoned WITHOUT scheduling a
    /// reconnect. A later manual `connect()` may still be attempted.
    fn on_dial_timeout(&self, generation: u64, timeout: Duration) {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.state != ConnectionState::Connecting {
                return;
            }
            inner.state = ConnectionState::Disconnected;
            inner.dial_guard = None;
        }
        let e = RealtimeError::ConnectTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
        warn!(error = %e, "handshake stuck, giving up without retry");
        self.bus
            .publish(CONNECTION_ERROR, &json!({"message": e.to_string()}));
    }

    /// The socket opened: flip to `Connected`, start the heartbeat, drain
    /// the queue oldest-first, announce, then start pumping inbound
    /// events.
    fn on_open(self: &Arc<Self>, generation: u64, socket: Socket) {
        let Socket { commands, events } = socket;

        let heartbeat = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.state != ConnectionState::Connecting {
                // Superseded (by disconnect() or a newer dial) while the
                // handshake completed; close the orphan politely.
                let _ = commands.try_send(SocketCommand::Close {
                    code: NORMAL_CLOSURE_CODE,
                    reason: "superseded".into(),
                });
                return;
            }
            inner.state = ConnectionState::Connected;
            inner.attempts = 0;
            inner.dial_guard = None;
            inner.socket = Some(commands);

            let heartbeat = CancellationToken::new();
            inner.heartbeat = Some(heartbeat.clone());

            Self::drain_locked(&mut inner);
            heartbeat
        };

        debug!(generation, "connected");
        let _ = tokio::spawn(run_heartbeat(
            Arc::downgrade(self),
            Duration::from_secs(self.config.heartbeat_interval_secs),
            heartbeat,
        ));

        self.bus.publish(CONNECTION_OPEN, &Value::Null);

        let manager = Arc::clone(self);
        let _ = tokio::spawn(async move {
            manager.run_reader(generation, events).await;
        });
    }

    /// Transmit queued messages strictly FIFO while the socket accepts
    /// them. Runs under the state lock, so no interleaved `send` can
    /// reorder traffic around the drain.
    fn drain_locked(inner: &mut Inner) {
        let Some(tx) = inner.socket.clone() else {
            return;
        };
        let mut drained = 0usize;
        while let Some(message) = inner.queue.pop_front() {
            let frame = match serde_json::to_string(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(kind = %message.kind, error = %e, "dropping unserializable queued message");
                    continue;
                }
            };
            if tx.try_send(SocketCommand::Send(frame)).is_err() {
                // Socket went away mid-drain; keep the remainder queued
                // for a future drain.
                inner.queue.push_front(message);
                break;
            }
            drained += 1;
        }
        if drained > 0 {
            debug!(drained, remaining = inner.queue.len(), "drained outbound queue");
        }
    }

    /// Pump raw socket events into the state machine until the socket
    /// closes.
    async fn run_reader(self: Arc<Self>, generation: u64, mut events: mpsc::Receiver<SocketEvent>) {
        let mut closed = false;
        while let Some(event) = events.recv().await {
            match event {
                SocketEvent::Message(text) => self.on_message(&text),
                SocketEvent::Error(detail) => {
                    warn!(error = %detail, "socket error");
                    self.bus
                        .publish(CONNECTION_ERROR, &json!({"message": detail}));
                }
                SocketEvent::Closed { code, reason } => {
                    self.on_close(generation, code, &reason);
                    closed = true;
                    break;
                }
            }
        }
        if !closed {
            // Transport dropped its event channel without the promised
            // close event; treat it like an abnormal closure.
            self.on_close(generation, ABNORMAL_CLOSURE_CODE, "transport vanished");
        }
    }

    /// Parse an inbound frame and republish it by type.
    fn on_message(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) if message.kind == PONG_TYPE => {
                // Liveness proof only; never republished.
                trace!("pong received");
            }
            Ok(message) => {
                trace!(kind = %message.kind, "inbound message");
                self.bus.publish(&message.kind, &message.data);
            }
            Err(e) => {
                let e = RealtimeError::Malformed(e.to_string());
                warn!(error = %e, "discarding inbound frame");
                self.bus
                    .publish(CONNECTION_ERROR, &json!({"message": e.to_string()}));
            }
        }
    }

    /// The socket closed: announce it and decide whether to retry.
    ///
    /// A close code of exactly 1000 signals an intentional, caller-driven
    /// disconnect and never triggers reconnection; anything else engages
    /// the scheduler.
    fn on_close(self: &Arc<Self>, generation: u64, code: u16, reason: &str) {
        let abnormal = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                trace!(generation, "close from superseded socket ignored");
                return;
            }
            inner.state = ConnectionState::Disconnected;
            inner.socket = None;
            if let Some(token) = inner.heartbeat.take() {
                token.cancel();
            }
            code != NORMAL_CLOSURE_CODE
        };

        debug!(code, reason, "connection closed");
        self.bus
            .publish(CONNECTION_CLOSE, &json!({"code": code, "reason": reason}));

        if abnormal {
            self.schedule_reconnect();
        }
    }

    // ─── Reconnect scheduling ────────────────────────────────────────────

    /// Arm the reconnect timer after an abnormal close.
    ///
    /// Delay is `min(base * 2^attempts, max)` plus uniform jitter in
    /// `[0, jitter)`, with `attempts` read before incrementing. At most
    /// one timer may be armed; a second request while one is outstanding
    /// is a no-op (overlapping close events must not stack retries).
    fn schedule_reconnect(self: &Arc<Self>) {
        let (seq, delay, cancel, attempt) = {
            let mut inner = self.inner.lock();
            if inner.reconnect.is_some() {
                trace!("reconnect already scheduled");
                return;
            }
            let attempt = inner.attempts;
            inner.attempts += 1;
            inner.state = ConnectionState::Reconnecting;

            let mut delay = reconnect_delay_ms(
                attempt,
                self.config.reconnect_base_ms,
                self.config.reconnect_max_ms,
            );
            if self.config.reconnect_jitter_ms > 0 {
                delay += rand::rng().random_range(0..self.config.reconnect_jitter_ms);
            }

            inner.reconnect_seq += 1;
            let cancel = CancellationToken::new();
            inner.reconnect = Some((inner.reconnect_seq, cancel.clone()));
            (inner.reconnect_seq, delay, cancel, attempt)
        };

        debug!(attempt, delay_ms = delay, "reconnect scheduled");
        let manager = Arc::clone(self);
        let _ = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(delay)) => {
                    manager.reconnect_fire(seq);
                }
                () = cancel.cancelled() => {
                    trace!("reconnect timer cancelled");
                }
            }
        });
    }

    /// The reconnect timer fired: clear the slot and dial again.
    ///
    /// `connect()` is invoked without re-checking the connection state;
    /// its own idempotency guard absorbs any race. The sequence check only
    /// filters out a timer that was cancelled between firing and running.
    fn reconnect_fire(self: &Arc<Self>, seq: u64) {
        {
            let mut inner = self.inner.lock();
            if inner.reconnect.as_ref().is_none_or(|(s, _)| *s != seq) {
                // Cancelled by disconnect() or superseded by a manual
                // connect() between firing and running.
                return;
            }
            inner.reconnect = None;
        }
        if let Err(e) = self.connect() {
            warn!(error = %e, "scheduled reconnect could not start");
        }
    }

    // ─── Heartbeat ───────────────────────────────────────────────────────

    /// Emit one keepalive ping if (and only if) the connection is open.
    pub(crate) fn heartbeat_tick(&self) {
        let inner = self.inner.lock();
        if inner.state != ConnectionState::Connected {
            return;
        }
        let Some(tx) = &inner.socket else {
            return;
        };
        match serde_json::to_string(&ClientMessage::ping()) {
            Ok(frame) => {
                // Best effort; a saturated writer just skips this beat.
                let _ = tx.try_send(SocketCommand::Send(frame));
            }
            Err(e) => error!(error = %e, "failed to serialize ping"),
        }
    }
}
