//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `DisplayName`: trimmed, non-empty pseudonym compared case-insensitively

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4, one per accepted connection.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name (pseudonym) a session is known by
///
/// Never empty. Two names are considered the same if they are equal
/// after lowercasing, so "alice" collides with "ALICE".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Parse a requested name, trimming surrounding whitespace
    ///
    /// Returns None for an empty or whitespace-only request.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Build the `n`-th suffixed candidate, e.g. "Bob" + 2 -> "Bob2"
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}{}", self.0, n))
    }

    /// Case-insensitive comparison used for uniqueness checks
    pub fn collides_with(&self, other: &DisplayName) -> bool {
        self.0 == other.0 || self.0.to_lowercase() == other.0.to_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
