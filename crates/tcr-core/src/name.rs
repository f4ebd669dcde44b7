//! Validated peer display names.
//!
//! A `PeerName` is the identity a client negotiates during the handshake
//! and keeps for the lifetime of its connection. Validation happens once,
//! at construction; a `PeerName` in hand is always non-blank and free of
//! whitespace. Uniqueness is the registry's job, not the type's.

use std::fmt;

use thiserror::Error;

/// A validated chat display name.
///
/// Immutable after construction. Surrounding whitespace is trimmed during
/// parsing; interior whitespace is rejected so names stay single tokens
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerName(String);

impl PeerName {
    /// Parses a raw candidate name.
    ///
    /// Trims surrounding whitespace first, then rejects candidates that
    /// are empty or contain whitespace.
    ///
    /// # Errors
    ///
    /// - `NameError::Blank` if nothing remains after trimming
    /// - `NameError::ContainsWhitespace` if interior whitespace is present
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(NameError::Blank);
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(NameError::ContainsWhitespace);
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PeerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reasons a candidate name fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    /// The candidate was empty after trimming.
    #[error("name cannot be blank")]
    Blank,

    /// The candidate contains interior whitespace.
    #[error("name cannot contain whitespace")]
    ContainsWhitespace,
}
