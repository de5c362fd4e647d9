//! Deterministic conversation addressing.
//!
//! A conversation is an unordered pair of user identities. Its id is derived
//! by sorting the two ids and joining them with `-`; no conversation record
//! is ever created or stored -- the id is purely a partition key.
//!
//! The send path never accepts a conversation id from a client: the only way
//! to obtain one for routing is [`ConversationId::of`], which takes two
//! already-validated [`UserId`] values. [`ConversationId::parse`] exists for
//! subscription and history lookups (where the client legitimately names a
//! conversation) and for rehydrating persisted rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::user::UserId;

/// Separator between the two participant ids.
///
/// Ids containing `-` can collide across distinct pairs. The surrounding
/// identity system does not issue such ids today; changing the separator
/// would orphan every already-persisted conversation id, so it stays.
pub const SEPARATOR: char = '-';

/// Stable identifier of a two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the conversation id for an unordered pair of participants.
    ///
    /// Commutative and deterministic: `of(a, b) == of(b, a)`.
    pub fn of(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{first}{SEPARATOR}{second}"))
    }

    /// Accept a conversation id named by a client (subscriptions, history
    /// fetches) or read back from storage. Rejects empty input only.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentityError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(IdentityError::EmptyConversation);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ConversationId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}
