//! Conversation identifiers.
//!
//! A conversation is keyed by the customer it belongs to: a signed-in
//! customer's email, or a durable anonymous `guest-...` id for visitors who
//! never signed in.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::email::Email;

/// Prefix carried by every anonymous conversation id.
pub const GUEST_PREFIX: &str = "guest-";

/// Errors that can occur when parsing a [`ConversationId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationIdError {
    /// The input string is empty or only whitespace.
    #[error("conversation id cannot be empty")]
    Empty,
    /// The input is longer than [`ConversationId::MAX_LENGTH`].
    #[error("conversation id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// Stable per-customer conversation identifier.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Maximum accepted length.
    pub const MAX_LENGTH: usize = 254;

    /// Parse a conversation id from free text.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationIdError`] for empty or oversized input.
    pub fn parse(s: &str) -> Result<Self, ConversationIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ConversationIdError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(ConversationIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Conversation id of a signed-in customer.
    #[must_use]
    pub fn from_email(email: &Email) -> Self {
        Self(email.as_str().to_owned())
    }

    /// Build an anonymous id from a creation time and a random suffix.
    #[must_use]
    pub fn guest(created_ms: i64, suffix: &str) -> Self {
        Self(format!("{GUEST_PREFIX}{created_ms}-{suffix}"))
    }

    /// Whether this id belongs to an anonymous visitor.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.0.starts_with(GUEST_PREFIX)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = ConversationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
