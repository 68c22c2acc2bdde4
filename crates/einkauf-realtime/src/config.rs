//! Connection manager configuration.
//!
//! Loading flow:
//! 1. Start with compiled [`RealtimeConfig::default()`]
//! 2. Apply environment variable overrides (highest priority)
//!
//! Each env var has strict parsing rules; invalid values are silently
//! ignored (fall back to the default).

use serde::{Deserialize, Serialize};

use einkauf_core::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_JITTER_MS, DEFAULT_MAX_DELAY_MS};

/// Configuration for the realtime connection manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeConfig {
    /// Server authority, e.g. `"localhost:8000"`.
    pub host: String,
    /// Use `wss` instead of `ws`; mirror the security of the surrounding
    /// deployment.
    pub secure: bool,
    /// Keepalive ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Bound on the WebSocket handshake; a dial still connecting when this
    /// expires is abandoned.
    pub connect_timeout_secs: u64,
    /// Maximum number of buffered outbound messages while disconnected.
    pub queue_capacity: usize,
    /// Base reconnect delay in milliseconds.
    pub reconnect_base_ms: u64,
    /// Reconnect delay cap in milliseconds.
    pub reconnect_max_ms: u64,
    /// Jitter bound in milliseconds; each reconnect adds a uniform random
    /// delay in `[0, bound)`.
    pub reconnect_jitter_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".into(),
            secure: false,
            heartbeat_interval_secs: 30,
            connect_timeout_secs: 5,
            queue_capacity: 100,
            reconnect_base_ms: DEFAULT_BASE_DELAY_MS,
            reconnect_max_ms: DEFAULT_MAX_DELAY_MS,
            reconnect_jitter_ms: DEFAULT_JITTER_MS,
        }
    }
}

impl RealtimeConfig {
    /// Defaults with environment variable overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Endpoint URL for the given credential: `ws[s]://{host}/ws/{token}`.
    #[must_use]
    pub fn endpoint_url(&self, token: &str) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}/ws/{token}", self.host)
    }

    /// Apply overrides from a string-valued lookup (`EINKAUF_*` names).
    ///
    /// Factored over a closure so tests can drive it without touching the
    /// process environment.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("EINKAUF_WS_HOST") {
            if !v.is_empty() {
                self.host = v;
            }
        }
        if let Some(v) = read_bool(&get, "EINKAUF_WS_SECURE") {
            self.secure = v;
        }
        if let Some(v) = read_u64(&get, "EINKAUF_HEARTBEAT_SECS", 1, 3600) {
            self.heartbeat_interval_secs = v;
        }
        if let Some(v) = read_u64(&get, "EINKAUF_CONNECT_TIMEOUT_SECS", 1, 300) {
            self.connect_timeout_secs = v;
        }
        if let Some(v) = read_u64(&get, "EINKAUF_QUEUE_CAPACITY", 1, 100_000) {
            #[allow(clippy::cast_possible_truncation)]
            {
                self.queue_capacity = v as usize;
            }
        }
        if let Some(v) = read_u64(&get, "EINKAUF_RECONNECT_BASE_MS", 1, 3_600_000) {
            self.reconnect_base_ms = v;
        }
        if let Some(v) = read_u64(&get, "EINKAUF_RECONNECT_MAX_MS", 1, 3_600_000) {
            self.reconnect_max_ms = v;
        }
    }
}

/// Parse an integer env value within `[min, max]`; out-of-range or
/// malformed values are ignored.
fn read_u64(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    min: u64,
    max: u64,
) -> Option<u64> {
    get(name)?
        .parse::<u64>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

/// Parse a boolean env value: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
fn read_bool(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    match get(name)?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_protocol_constants() {
        let cfg = RealtimeConfig::default();
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.connect_timeout_secs, 5);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.reconnect_base_ms, 1000);
        assert_eq!(cfg.reconnect_max_ms, 30_000);
        assert_eq!(cfg.reconnect_jitter_ms, 1000);
        assert!(!cfg.secure);
    }

    #[test]
    fn endpoint_url_embeds_token() {
        let cfg = RealtimeConfig::default();
        assert_eq!(
            cfg.endpoint_url("abc123"),
            "ws://localhost:8000/ws/abc123"
        );
    }

    #[test]
    fn endpoint_url_mirrors_security() {
        let cfg = RealtimeConfig {
            host: "list.example.org".into(),
            secure: true,
            ..RealtimeConfig::default()
        };
        assert_eq!(
            cfg.endpoint_url("tok"),
            "wss://list.example.org/ws/tok"
        );
    }

    #[test]
    fn overrides_apply_valid_values() {
        let mut cfg = RealtimeConfig::default();
        cfg.apply_overrides(lookup(&[
            ("EINKAUF_WS_HOST", "lists.example.org:9000"),
            ("EINKAUF_WS_SECURE", "yes"),
            ("EINKAUF_HEARTBEAT_SECS", "10"),
            ("EINKAUF_QUEUE_CAPACITY", "50"),
        ]));
        assert_eq!(cfg.host, "lists.example.org:9000");
        assert!(cfg.secure);
        assert_eq!(cfg.heartbeat_interval_secs, 10);
        assert_eq!(cfg.queue_capacity, 50);
    }

    #[test]
    fn invalid_overrides_fall_back_to_defaults() {
        let mut cfg = RealtimeConfig::default();
        cfg.apply_overrides(lookup(&[
            ("EINKAUF_WS_SECURE", "maybe"),
            ("EINKAUF_HEARTBEAT_SECS", "not-a-number"),
            ("EINKAUF_QUEUE_CAPACITY", "0"),
            ("EINKAUF_WS_HOST", ""),
        ]));
        let defaults = RealtimeConfig::default();
        assert_eq!(cfg.host, defaults.host);
        assert!(!cfg.secure);
        assert_eq!(cfg.heartbeat_interval_secs, defaults.heartbeat_interval_secs);
        assert_eq!(cfg.queue_capacity, defaults.queue_capacity);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = RealtimeConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RealtimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, cfg.host);
        assert_eq!(back.queue_capacity, cfg.queue_capacity);
    }

    #[test]
    fn partial_json_uses_field_defaults() {
        let cfg: RealtimeConfig =
            serde_json::from_str(r#"{"host": "other:1234"}"#).unwrap();
        assert_eq!(cfg.host, "other:1234");
        assert_eq!(cfg.queue_capacity, 100);
    }
}
