//! Session identifier type.
//!
//! Identifiers are random UUID v4 strings, so collisions between live
//! sessions are negligible. Client-supplied identifiers are accepted as
//! arbitrary strings; anything that was never issued simply fails lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A type-safe wrapper around the string form of a session id.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random session id.
    ///
    /// # Example
    /// ```
    /// use presence::id::SessionId;
    ///
    /// let session_id = SessionId::new();
    /// assert_eq!(session_id.as_str().len(), 36);
    /// ```
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps a client-supplied value without validating it.
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::from_string(value.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
