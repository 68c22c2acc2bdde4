//! Error hierarchy for the realtime client.
//!
//! Built on [`thiserror`]. Almost all failures in the connection manager are
//! observable rather than thrown: they surface through the
//! `connection:error` / `connection:close` event categories and the manager
//! keeps running. The variants here exist for the few synchronous contract
//! violations (`NoCredentials`), for internal reporting, and so that error
//! payloads published on the bus carry consistent wording.

use thiserror::Error;

/// Errors produced by the realtime connection manager.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// `connect()` was invoked without a usable authentication token.
    ///
    /// This is a programmer-error guard, not a transient condition; the
    /// manager never retries it on its own.
    #[error("no valid authentication token available")]
    NoCredentials,

    /// The transport handshake failed (DNS, TCP, TLS, or WebSocket upgrade).
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// The handshake did not complete within the configured bound.
    #[error("connection attempt timed out after {timeout_ms} ms")]
    ConnectTimeout {
        /// The bound that was exceeded, in milliseconds.
        timeout_ms: u64,
    },

    /// The outbound queue is at capacity; the new message was dropped.
    #[error("outbound queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// An inbound frame was not structurally valid JSON for the wire
    /// envelope. The frame is discarded; the connection is unaffected.
    #[error("malformed server message: {0}")]
    Malformed(String),
}

impl RealtimeError {
    /// Whether the condition is expected to clear on its own (or on the
    /// next reconnect) without caller intervention.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NoCredentials | Self::ConnectTimeout { .. } => false,
            Self::ConnectFailed(_) | Self::QueueFull { .. } | Self::Malformed(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn no_credentials_is_not_recoverable() {
        assert!(!RealtimeError::NoCredentials.is_recoverable());
    }

    #[test]
    fn connect_timeout_is_not_recoverable() {
        assert!(!RealtimeError::ConnectTimeout { timeout_ms: 5000 }.is_recoverable());
    }

    #[test]
    fn transient_errors_are_recoverable() {
        assert!(RealtimeError::ConnectFailed("refused".into()).is_recoverable());
        assert!(RealtimeError::QueueFull { capacity: 100 }.is_recoverable());
        assert!(RealtimeError::Malformed("not json".into()).is_recoverable());
    }

    #[test]
    fn display_includes_context() {
        let err = RealtimeError::QueueFull { capacity: 100 };
        assert_eq!(err.to_string(), "outbound queue full (capacity 100)");

        let err = RealtimeError::ConnectTimeout { timeout_ms: 5000 };
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn malformed_carries_parse_context() {
        let err = RealtimeError::Malformed("expected value at line 1".into());
        assert_matches!(err, RealtimeError::Malformed(msg) if msg.contains("line 1"));
    }
}
