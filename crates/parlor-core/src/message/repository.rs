//! MessageRepository trait definition.
//!
//! Append/read-only persistence for messages, keyed by conversation id.
//! Implementations live in parlor-infra (e.g., `SqliteMessageRepository`).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use parlor_types::conversation::ConversationId;
use parlor_types::error::RepositoryError;
use parlor_types::message::{Message, MessageDraft};

/// Repository trait for durable message persistence.
///
/// The store owns identity and timestamp assignment: callers hand in a
/// [`MessageDraft`] and get back the persisted [`Message`]. There are no
/// update or delete operations -- messages are immutable once stored.
pub trait MessageRepository: Send + Sync {
    /// Persist a draft, assigning its id and timestamp.
    fn append(
        &self,
        draft: &MessageDraft,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// At most `limit` most-recent messages of a conversation, ascending by
    /// timestamp (the oldest of the returned window first).
    fn recent(
        &self,
        conversation_id: &ConversationId,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Every stored message, newest first. Unpaginated; backs the
    /// administrative history endpoint.
    fn all_recent_first(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;
}
