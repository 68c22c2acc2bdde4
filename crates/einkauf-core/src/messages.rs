//! Wire message envelopes.
//!
//! The server speaks a thin JSON envelope in both directions:
//!
//! - outbound: `{"type": string, "data": any, "timestamp"?: ISO-8601,
//!   "userId"?: integer}`
//! - inbound: `{"type": string, "data": any}`
//!
//! Anything beyond this structure is opaque to the connection manager;
//! payload schemas belong to the application code subscribed to each
//! category.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::PING_TYPE;
use crate::ids::UserId;

/// An outbound message, as created by application code and queued or
/// transmitted by the connection manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Message category, e.g. `"item:add"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Structured payload; `null` when the category alone carries meaning.
    pub data: Value,
    /// ISO-8601 creation time, stamped by [`ClientMessage::new`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Originating user, when known.
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl ClientMessage {
    /// Create a message with the current UTC time stamped on it.
    #[must_use]
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            user_id: None,
        }
    }

    /// Create the keepalive probe message.
    ///
    /// Pings are minimal on the wire: no timestamp, no user attribution.
    #[must_use]
    pub fn ping() -> Self {
        Self {
            kind: PING_TYPE.to_string(),
            data: Value::Null,
            timestamp: None,
            user_id: None,
        }
    }

    /// Attach the originating user.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// An inbound message as broadcast by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Message category; doubles as the event-bus category on republish.
    #[serde(rename = "type")]
    pub kind: String,
    /// Structured payload; defaults to `null` when the server omits it.
    #[serde(default)]
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_message_wire_shape() {
        let msg = ClientMessage::new("item:add", json!({"name": "Milch"})).with_user(UserId(3));
        let wire: Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(wire["type"], "item:add");
        assert_eq!(wire["data"]["name"], "Milch");
        assert_eq!(wire["userId"], 3);
        assert!(wire["timestamp"].is_string());
    }

    #[test]
    fn new_stamps_parseable_timestamp() {
        let msg = ClientMessage::new("item:add", Value::Null);
        let stamp = msg.timestamp.expect("timestamp must be stamped");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[test]
    fn optional_fields_are_omitted_from_wire() {
        let msg = ClientMessage::ping();
        let wire = serde_json::to_string(&msg).unwrap();

        assert!(!wire.contains("timestamp"));
        assert!(!wire.contains("userId"));
        assert_eq!(
            serde_json::from_str::<Value>(&wire).unwrap(),
            json!({"type": "ping", "data": null})
        );
    }

    #[test]
    fn server_message_parses_envelope() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type": "item:deleted", "data": {"id": 12}}"#).unwrap();
        assert_eq!(msg.kind, "item:deleted");
        assert_eq!(msg.data, json!({"id": 12}));
    }

    #[test]
    fn server_message_data_defaults_to_null() {
        let msg: ServerMessage = serde_json::from_str(r#"{"type": "pong"}"#).unwrap();
        assert_eq!(msg.kind, "pong");
        assert!(msg.data.is_null());
    }

    #[test]
    fn server_message_rejects_missing_type() {
        let result = serde_json::from_str::<ServerMessage>(r#"{"data": {}}"#);
        assert!(result.is_err());
    }
}
