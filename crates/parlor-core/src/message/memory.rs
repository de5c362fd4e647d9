//! In-memory MessageRepository.
//!
//! Backs the delivery-router unit tests and ephemeral (no-database) runs.
//! Write/read failures can be injected to exercise the router's
//! storage-error paths.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use uuid::Uuid;

use parlor_types::conversation::ConversationId;
use parlor_types::error::RepositoryError;
use parlor_types::message::{Message, MessageDraft};

use crate::message::repository::MessageRepository;

/// Vec-backed message store. Insertion order is chronological order, since
/// the store assigns timestamps itself.
pub struct MemoryMessageRepository {
    messages: Mutex<Vec<Message>>,
    fail_appends: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_appends: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make subsequent `append` calls fail with a query error.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent reads fail with a query error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRepository for MemoryMessageRepository {
    async fn append(&self, draft: &MessageDraft) -> Result<Message, RepositoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("append failed".to_string()));
        }
        let message = draft.clone().into_message(Uuid::now_v7(), Utc::now());
        self.messages
            .lock()
            .expect("store lock poisoned")
            .push(message.clone());
        Ok(message)
    }

    async fn recent(
        &self,
        conversation_id: &ConversationId,
        limit: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("read failed".to_string()));
        }
        let messages = self.messages.lock().expect("store lock poisoned");
        let matching: Vec<Message> = messages
            .iter()
            .filter(|m| &m.conversation_id == conversation_id)
            .cloned()
            .collect();
        let window_start = matching.len().saturating_sub(limit.max(0) as usize);
        Ok(matching[window_start..].to_vec())
    }

    async fn all_recent_first(&self) -> Result<Vec<Message>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("read failed".to_string()));
        }
        let messages = self.messages.lock().expect("store lock poisoned");
        Ok(messages.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::user::UserId;

    fn draft(a: &str, b: &str, body: &str) -> MessageDraft {
        let sender = UserId::new(a).unwrap();
        let receiver = UserId::new(b).unwrap();
        MessageDraft {
            conversation_id: ConversationId::of(&sender, &receiver),
            sender_id: sender,
            receiver_id: receiver,
            body: body.to_string(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn test_recent_window_keeps_newest_in_ascending_order() {
        let repo = MemoryMessageRepository::new();
        repo.append(&draft("a", "b", "one")).await.unwrap();
        repo.append(&draft("a", "b", "two")).await.unwrap();
        repo.append(&draft("a", "b", "three")).await.unwrap();

        let conv = ConversationId::of(&UserId::new("a").unwrap(), &UserId::new("b").unwrap());
        let window = repo.recent(&conv, 2).await.unwrap();
        let bodies: Vec<&str> = window.iter().map(|m| m.body.as_str()).collect();
        // The oldest message never appears once the window is exceeded.
        assert_eq!(bodies, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_recent_filters_by_conversation() {
        let repo = MemoryMessageRepository::new();
        repo.append(&draft("a", "b", "for ab")).await.unwrap();
        repo.append(&draft("a", "c", "for ac")).await.unwrap();

        let conv = ConversationId::of(&UserId::new("a").unwrap(), &UserId::new("b").unwrap());
        let window = repo.recent(&conv, 50).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].body, "for ab");
    }

    #[tokio::test]
    async fn test_all_recent_first() {
        let repo = MemoryMessageRepository::new();
        repo.append(&draft("a", "b", "old")).await.unwrap();
        repo.append(&draft("a", "c", "new")).await.unwrap();

        let all = repo.all_recent_first().await.unwrap();
        assert_eq!(all[0].body, "new");
        assert_eq!(all[1].body, "old");
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let repo = MemoryMessageRepository::new();
        repo.set_fail_appends(true);
        assert!(repo.append(&draft("a", "b", "x")).await.is_err());
        assert!(repo.is_empty());

        repo.set_fail_appends(false);
        repo.append(&draft("a", "b", "x")).await.unwrap();
        repo.set_fail_reads(true);
        assert!(repo.all_recent_first().await.is_err());
    }
}
