//! Branded ID newtypes for type safety.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned user identifier.
///
/// Carried as the `userId` field on outbound wire messages so the server
/// can attribute changes to the originating user. Serializes transparently
/// as a plain integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Return the inner integer value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
