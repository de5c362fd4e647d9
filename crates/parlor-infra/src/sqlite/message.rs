//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `parlor-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, writer pool for the
//! append, reader pool for the history windows.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use parlor_core::message::MessageRepository;
use parlor_types::conversation::ConversationId;
use parlor_types::error::RepositoryError;
use parlor_types::message::{Attachment, Message, MessageDraft};
use parlor_types::user::UserId;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Message.
struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    receiver_id: String,
    body: String,
    attachment: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            body: row.try_get("body")?,
            attachment: row.try_get("attachment")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let conversation_id = ConversationId::parse(self.conversation_id)
            .map_err(|e| RepositoryError::Query(format!("invalid conversation_id: {e}")))?;
        let sender_id = UserId::new(self.sender_id)
            .map_err(|e| RepositoryError::Query(format!("invalid sender_id: {e}")))?;
        let receiver_id = UserId::new(self.receiver_id)
            .map_err(|e| RepositoryError::Query(format!("invalid receiver_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;
        let attachment: Option<Attachment> = self
            .attachment
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid attachment json: {e}")))?;

        Ok(Message {
            id,
            conversation_id,
            sender_id,
            receiver_id,
            body: self.body,
            attachment,
            created_at,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn rows_into_messages(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Message>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in &rows {
        let message_row =
            MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        messages.push(message_row.into_message()?);
    }
    Ok(messages)
}

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, draft: &MessageDraft) -> Result<Message, RepositoryError> {
        let id = Uuid::now_v7();
        let created_at = Utc::now();
        let attachment_json = draft
            .attachment
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("attachment serialization: {e}")))?;

        sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, sender_id, receiver_id, body, attachment, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(draft.conversation_id.as_str())
        .bind(draft.sender_id.as_str())
        .bind(draft.receiver_id.as_str())
        .bind(&draft.body)
        .bind(&attachment_json)
        .bind(format_datetime(&created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(draft.clone().into_message(id, created_at))
    }

    async fn recent(
        &self,
        conversation_id: &ConversationId,
        limit: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        // Newest `limit` rows, then flipped so the oldest of the window
        // comes first. UUIDv7 ids tie-break equal timestamps.
        let rows = sqlx::query(
            r#"SELECT * FROM messages
               WHERE conversation_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(conversation_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = rows_into_messages(rows)?;
        messages.reverse();
        Ok(messages)
    }

    async fn all_recent_first(&self) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM messages ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_into_messages(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> (SqliteMessageRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("messages.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (SqliteMessageRepository::new(pool), dir)
    }

    fn draft(sender: &str, receiver: &str, body: &str) -> MessageDraft {
        let sender = UserId::new(sender).unwrap();
        let receiver = UserId::new(receiver).unwrap();
        MessageDraft {
            conversation_id: ConversationId::of(&sender, &receiver),
            sender_id: sender,
            receiver_id: receiver,
            body: body.to_string(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn test_append_assigns_identity_and_timestamp() {
        let (repo, _dir) = repo().await;
        let before = Utc::now();
        let message = repo.append(&draft("alice", "bob", "hello")).await.unwrap();

        assert_eq!(message.conversation_id.as_str(), "alice-bob");
        assert!(message.created_at >= before);

        let conv = message.conversation_id.clone();
        let stored = repo.recent(&conv, 50).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], message);
    }

    #[tokio::test]
    async fn test_recent_window_is_newest_ascending() {
        let (repo, _dir) = repo().await;
        repo.append(&draft("a", "b", "first")).await.unwrap();
        repo.append(&draft("a", "b", "second")).await.unwrap();
        repo.append(&draft("a", "b", "third")).await.unwrap();

        let conv = ConversationId::of(&UserId::new("a").unwrap(), &UserId::new("b").unwrap());
        let window = repo.recent(&conv, 2).await.unwrap();
        let bodies: Vec<&str> = window.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["second", "third"]);
    }

    #[tokio::test]
    async fn test_recent_scopes_to_conversation() {
        let (repo, _dir) = repo().await;
        repo.append(&draft("a", "b", "ab")).await.unwrap();
        repo.append(&draft("c", "d", "cd")).await.unwrap();

        let conv = ConversationId::of(&UserId::new("a").unwrap(), &UserId::new("b").unwrap());
        let window = repo.recent(&conv, 50).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].body, "ab");
    }

    #[tokio::test]
    async fn test_all_recent_first_spans_conversations() {
        let (repo, _dir) = repo().await;
        repo.append(&draft("a", "b", "older")).await.unwrap();
        repo.append(&draft("c", "d", "newer")).await.unwrap();

        let all = repo.all_recent_first().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].body, "newer");
        assert_eq!(all[1].body, "older");
    }

    #[tokio::test]
    async fn test_attachment_survives_storage() {
        let (repo, _dir) = repo().await;
        let mut d = draft("a", "b", "see attached");
        d.attachment = Some(Attachment {
            file_name: "notes.txt".to_string(),
            mime_type: Some("text/plain".to_string()),
            url: None,
            size_bytes: Some(120),
        });

        let message = repo.append(&d).await.unwrap();
        let conv = message.conversation_id.clone();
        let stored = repo.recent(&conv, 50).await.unwrap();
        let attachment = stored[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, "notes.txt");
        assert_eq!(attachment.size_bytes, Some(120));
    }
}
