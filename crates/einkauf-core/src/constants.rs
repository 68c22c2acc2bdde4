//! Protocol-level constants.

/// Current version of the Einkauf client (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WebSocket close code for an intentional, orderly shutdown.
///
/// This is the only code that never triggers automatic reconnection; it is
/// produced exclusively by an explicit `disconnect()`.
pub const NORMAL_CLOSURE_CODE: u16 = 1000;

/// WebSocket close code for an abnormal closure (connection dropped without
/// a close handshake).
pub const ABNORMAL_CLOSURE_CODE: u16 = 1006;

/// Message type of the outbound keepalive probe.
pub const PING_TYPE: &str = "ping";

/// Message type of the keepalive response.
///
/// Inbound messages with this type are consumed by the connection manager
/// and never republished to subscribers.
pub const PONG_TYPE: &str = "pong";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION must be semver (MAJOR.MINOR.PATCH)");
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn close_codes_are_distinct() {
        assert_ne!(NORMAL_CLOSURE_CODE, ABNORMAL_CLOSURE_CODE);
    }

    #[test]
    fn keepalive_types_are_distinct() {
        assert_ne!(PING_TYPE, PONG_TYPE);
    }
}
