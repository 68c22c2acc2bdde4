//! # einkauf-realtime
//!
//! Client-side connection manager for the Einkauf realtime channel: a
//! persistent bidirectional WebSocket to the list server, driven by a
//! protocol state machine.
//!
//! The manager owns the single logical connection per process and provides:
//!
//! - **Lifecycle**: `connect` / `disconnect` with an idempotent connect
//!   guard and a bounded handshake timer
//! - **Recovery**: exponential backoff with jitter after abnormal closes;
//!   an intentional close (code 1000) never reconnects
//! - **Buffering**: a bounded FIFO outbound queue, drained oldest-first on
//!   reaching the connected state
//! - **Liveness**: an application-level ping on a fixed interval while
//!   connected
//! - **Fan-out**: an [`EventBus`] republishing inbound messages (and
//!   connection lifecycle events) to independent subscribers
//!
//! Application code holds the manager behind an [`std::sync::Arc`], sends
//! fire-and-forget [`einkauf_core::ClientMessage`]s, and subscribes to
//! string categories. Everything else — REST calls, rendering, widgets —
//! lives outside this crate and only talks to it through that surface.

#![deny(unsafe_code)]

pub mod bus;
pub mod config;
pub mod heartbeat;
pub mod manager;
pub mod queue;
pub mod transport;

pub use bus::{EventBus, Subscription};
pub use config::RealtimeConfig;
pub use manager::{ConnectionManager, ConnectionState, TokenProvider};
pub use transport::{Socket, SocketCommand, SocketEvent, Transport, WsTransport};
