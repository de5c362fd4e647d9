//! User identity type.
//!
//! Identities are issued and verified by the surrounding application's auth
//! layer; this service treats them as opaque strings. The only validation
//! applied here is non-emptiness, enforced at construction so every
//! `UserId` in circulation is usable as a conversation-address component.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Opaque, stable identity of a user.
///
/// Construction goes through [`UserId::new`], which rejects empty (or
/// whitespace-only) input. Serde deserialization routes through the same
/// check via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a validated user id. Fails on empty input.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdentityError::EmptyUser);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_plain_id() {
        let id = UserId::new("alice").unwrap();
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(UserId::new("").unwrap_err(), IdentityError::EmptyUser);
        assert_eq!(UserId::new("   ").unwrap_err(), IdentityError::EmptyUser);
    }

    #[test]
    fn test_serde_rejects_empty() {
        let parsed: Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: UserId = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(parsed.as_str(), "bob");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = UserId::new("alice").unwrap();
        let b = UserId::new("bob").unwrap();
        assert!(a < b);
    }
}
