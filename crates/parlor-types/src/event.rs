//! Realtime event surface for the WebSocket connection.
//!
//! Events are JSON text frames tagged by a `type` field, camelCase on the
//! wire. Clients send [`ClientEvent`]s; the server answers with
//! [`ServerEvent`]s. Unknown or malformed frames are logged and ignored by
//! the connection handler.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::message::{Message, MessageSubmission};
use crate::user::UserId;

/// Incoming event from a connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Announce the identity bound to this connection.
    #[serde(rename_all = "camelCase")]
    Join { user_id: String },

    /// Subscribe this connection to a conversation's broadcast group.
    #[serde(rename_all = "camelCase")]
    JoinConversation { conversation_id: String },

    /// Submit a message for persistence and delivery.
    SendMessage(MessageSubmission),

    /// Request the recent history window for a conversation.
    #[serde(rename_all = "camelCase")]
    FetchMessages { conversation_id: String },

    /// Keep-alive. Server responds with `{"type":"pong"}`.
    Ping,
}

/// Outgoing event from the server to one or more clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full set of currently-online user ids, broadcast to every
    /// connection after each presence change.
    OnlineUsers { users: Vec<UserId> },

    /// A newly persisted message, delivered to the conversation group and
    /// directly to the receiver.
    Message(Message),

    /// A `sendMessage` failed before delivery; sent to the sender alone.
    MessageError { error: String },

    /// History window answering a `fetchMessages` request.
    #[serde(rename_all = "camelCase")]
    PreviousMessages {
        conversation_id: ConversationId,
        messages: Vec<Message>,
    },

    /// A `fetchMessages` failed; sent to the requester alone.
    FetchError { error: String },

    /// Keep-alive reply.
    Pong,
}
