//! Well-known event categories.
//!
//! Categories are plain strings with no compile-time enumeration — any
//! component may publish or subscribe to any category. The constants here
//! only fix the spelling of the categories the client itself emits and the
//! ones the list server is known to broadcast, so application code and
//! tests share them with the server.

// ─────────────────────────────────────────────────────────────────────────────
// Connection lifecycle (emitted by the connection manager)
// ─────────────────────────────────────────────────────────────────────────────

/// Published once per successful open, with no payload.
pub const CONNECTION_OPEN: &str = "connection:open";

/// Published when the socket closes, with `{"code": u16, "reason": string}`.
pub const CONNECTION_CLOSE: &str = "connection:close";

/// Published for transport errors, parse failures, and queue overflow.
pub const CONNECTION_ERROR: &str = "connection:error";

// ─────────────────────────────────────────────────────────────────────────────
// Server broadcasts (republished verbatim, keyed by their `type` field)
// ─────────────────────────────────────────────────────────────────────────────

/// A shopping-list item was added.
pub const ITEM_ADDED: &str = "item:added";

/// A shopping-list item was updated (quantity merge, rename, check-off).
pub const ITEM_UPDATED: &str = "item:updated";

/// A shopping-list item was deleted.
pub const ITEM_DELETED: &str = "item:deleted";

/// A measurement unit was created.
pub const UNIT_CREATED: &str = "unit:created";

/// A measurement unit was updated.
pub const UNIT_UPDATED: &str = "unit:updated";

/// A measurement unit was deleted.
pub const UNIT_DELETED: &str = "unit:deleted";

/// Another user connected to the realtime channel.
pub const USER_JOINED: &str = "user:joined";

/// All server broadcast categories, in one place for "subscribe to
/// everything" consumers such as the diagnostic CLI.
pub const SERVER_CATEGORIES: &[&str] = &[
    ITEM_ADDED,
    ITEM_UPDATED,
    ITEM_DELETED,
    UNIT_CREATED,
    UNIT_UPDATED,
    UNIT_DELETED,
    USER_JOINED,
];
