//! Newtype wrappers for domain identifiers.
//!
//! These types keep codes, credentials, and session identifiers from being
//! mixed up at call sites (e.g., passing a user hash where a code is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A promotional code awaiting or having completed redemption.
///
/// Codes are compared exactly; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Parses a candidate string as detected on a page.
    ///
    /// Surrounding whitespace is trimmed. Returns `None` if nothing remains.
    pub fn parse(candidate: &str) -> Option<Self> {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Code(trimmed.to_string()))
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        Code(s.to_string())
    }
}

/// The player's account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        UserId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The secret hash paired with a [`UserId`].
///
/// `Debug` and `Display` redact the value so it never ends up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserHash(pub String);

impl UserHash {
    pub fn new(s: impl Into<String>) -> Self {
        UserHash(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for UserHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserHash(<redacted>)")
    }
}

impl fmt::Display for UserHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// A session-scoped instance identifier.
///
/// The remote API invalidates these whenever the game client starts a new
/// session, so a stored value may be stale at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(s: impl Into<String>) -> Self {
        InstanceId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Base URL of a play server, as returned by server resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerUrl(pub String);

impl ServerUrl {
    pub fn new(s: impl Into<String>) -> Self {
        ServerUrl(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
