//! Type-safe session identifiers.
//!
//! A session ID is an opaque string whose canonical form is the textual
//! UUID shape `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` (hex, case-insensitive).
//! Server-generated IDs are random UUID v4 values; client-supplied IDs are
//! accepted as-is once they pass [`is_valid_session_id`].

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// Validator
// ============================================================================

/// 8-4-4-4-12 hex groups, anchored at both ends.
static SESSION_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("session id pattern is a valid regex")
});

/// Returns `true` if `value` has the canonical session ID shape.
///
/// Empty strings, surrounding whitespace, wrong group lengths and non-hex
/// characters are all rejected.
#[inline]
#[must_use]
pub fn is_valid_session_id(value: &str) -> bool {
    !value.is_empty() && SESSION_ID_PATTERN.is_match(value)
}

// ============================================================================
// SessionId
// ============================================================================

/// Identifier of one logical MCP session.
///
/// Shared by the transport registry and the position store; the two are
/// otherwise independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random session ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parses a client-supplied session ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionId`] if `value` fails
    /// [`is_valid_session_id`].
    pub fn parse(value: &str) -> Result<Self> {
        if is_valid_session_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::invalid_session_id(value))
        }
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Registry lookups take the raw header value.
impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Tests
// ============================================================================
