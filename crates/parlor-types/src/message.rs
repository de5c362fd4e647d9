//! Message types for Parlor.
//!
//! A [`MessageDraft`] is the in-flight form produced by the delivery router;
//! the store assigns persistence identity and timestamp and hands back the
//! immutable [`Message`]. Messages are append-only: there is no update or
//! delete anywhere in the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ConversationId;
use crate::user::UserId;

/// Attachment metadata carried alongside a message body.
///
/// The file itself lives wherever the surrounding application keeps uploads;
/// only the descriptive metadata travels through this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Raw `sendMessage` payload as submitted by a client.
///
/// Sender and receiver arrive unvalidated; the router turns them into
/// [`UserId`]s and derives the conversation id itself. A client-supplied
/// `conversationId` field is not represented here at all, so it is dropped
/// during deserialization and can never reach routing or persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSubmission {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// A validated message awaiting persistence.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// A persisted message. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl MessageDraft {
    /// Promote a draft to a stored message with the identity and timestamp
    /// the persistence layer assigned.
    pub fn into_message(self, id: Uuid, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            body: self.body,
            attachment: self.attachment,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MessageDraft {
        let sender = UserId::new("alice").unwrap();
        let receiver = UserId::new("bob").unwrap();
        MessageDraft {
            conversation_id: ConversationId::of(&sender, &receiver),
            sender_id: sender,
            receiver_id: receiver,
            body: "hello".to_string(),
            attachment: None,
        }
    }

    #[test]
    fn test_draft_promotion_keeps_fields() {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let message = draft().into_message(id, now);
        assert_eq!(message.id, id);
        assert_eq!(message.created_at, now);
        assert_eq!(message.conversation_id.as_str(), "alice-bob");
        assert_eq!(message.body, "hello");
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let message = draft().into_message(Uuid::now_v7(), Utc::now());
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"conversationId\":\"alice-bob\""));
        assert!(json.contains("\"senderId\":\"alice\""));
        assert!(json.contains("\"createdAt\""));
        // No attachment key when absent.
        assert!(!json.contains("attachment"));
    }

    #[test]
    fn test_submission_drops_client_conversation_id() {
        let raw = r#"{
            "senderId": "alice",
            "receiverId": "bob",
            "body": "hi",
            "conversationId": "spoofed-pair"
        }"#;
        let submission: MessageSubmission = serde_json::from_str(raw).unwrap();
        assert_eq!(submission.sender_id, "alice");
        assert_eq!(submission.receiver_id, "bob");
        // The spoofed id has nowhere to land: the type has no such field.
        let back = serde_json::to_string(&submission).unwrap();
        assert!(!back.contains("spoofed"));
    }

    #[test]
    fn test_attachment_roundtrip() {
        let attachment = Attachment {
            file_name: "resume.pdf".to_string(),
            mime_type: Some("application/pdf".to_string()),
            url: Some("/uploads/resume.pdf".to_string()),
            size_bytes: Some(48_213),
        };
        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("\"fileName\":\"resume.pdf\""));
        let parsed: Attachment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, attachment);
    }
}
