//! Delivery router: the authoritative path from "a connection wants to
//! send a message" to "message is durable and delivered".
//!
//! Send pipeline: validate identities, derive the conversation id from
//! sender and receiver (a client-supplied id never participates -- see
//! [`parlor_types::conversation`]), persist, then fan out to the
//! conversation's broadcast group and, redundantly, directly to the
//! receiver's presence connection when it is not already a group member.
//! Durability precedes fan-out: nothing is broadcast unless the append
//! succeeded.
//!
//! The router does not deduplicate across the two delivery channels. A
//! receiver subscribed on one connection while present on another gets the
//! message on both; the second copy is the cost of covering receivers who
//! are online but have not opened the conversation.

use std::sync::Arc;

use tracing::{debug, error, warn};

use parlor_types::conversation::ConversationId;
use parlor_types::event::ServerEvent;
use parlor_types::message::{MessageDraft, MessageSubmission};
use parlor_types::user::UserId;

use crate::conversation::GroupTable;
use crate::message::MessageRepository;
use crate::presence::PresenceRegistry;
use crate::session::ConnectionHandle;

/// Orchestrates persistence and dual-path delivery of messages.
///
/// Generic over [`MessageRepository`] to maintain clean architecture
/// (parlor-core never depends on parlor-infra).
pub struct DeliveryRouter<R: MessageRepository> {
    repo: R,
    registry: Arc<PresenceRegistry>,
    groups: Arc<GroupTable>,
    history_window: i64,
}

impl<R: MessageRepository> DeliveryRouter<R> {
    pub fn new(
        repo: R,
        registry: Arc<PresenceRegistry>,
        groups: Arc<GroupTable>,
        history_window: i64,
    ) -> Self {
        Self {
            repo,
            registry,
            groups,
            history_window,
        }
    }

    /// Access the message repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Persist and deliver a submitted message.
    ///
    /// A submission missing either identity is logged and dropped without
    /// touching any state -- no error frame goes back. Storage failures are
    /// reported to `origin` alone as a `messageError`; no other connection
    /// observes anything.
    pub async fn send(&self, origin: &ConnectionHandle, submission: MessageSubmission) {
        let Ok(sender) = UserId::new(submission.sender_id) else {
            warn!(conn_id = %origin.id(), "sendMessage dropped: missing senderId");
            return;
        };
        let Ok(receiver) = UserId::new(submission.receiver_id) else {
            warn!(conn_id = %origin.id(), sender = %sender, "sendMessage dropped: missing receiverId");
            return;
        };

        let conversation_id = ConversationId::of(&sender, &receiver);
        let draft = MessageDraft {
            conversation_id: conversation_id.clone(),
            sender_id: sender,
            receiver_id: receiver.clone(),
            body: submission.body,
            attachment: submission.attachment,
        };

        let message = match self.repo.append(&draft).await {
            Ok(message) => message,
            Err(err) => {
                error!(conversation = %conversation_id, error = %err, "message append failed");
                origin.send(ServerEvent::MessageError {
                    error: err.to_string(),
                });
                return;
            }
        };

        // Group fan-out from a membership snapshot. Handles that died since
        // the snapshot drop the event silently.
        let members = self.groups.members(&conversation_id);
        for conn in &members {
            if let Some(handle) = self.registry.handle(conn) {
                handle.send(ServerEvent::Message(message.clone()));
            }
        }

        // Direct delivery covers a receiver who is online but has not
        // joined this conversation's group yet.
        if let Some(handle) = self.registry.lookup(&receiver) {
            if !members.contains(&handle.id()) {
                handle.send(ServerEvent::Message(message.clone()));
            }
        }

        debug!(
            conversation = %conversation_id,
            message_id = %message.id,
            group_size = members.len(),
            "message delivered"
        );
    }

    /// Answer a history request with the recent window, to the requester
    /// only.
    pub async fn fetch(&self, origin: &ConnectionHandle, conversation_id: &str) {
        let Ok(conversation_id) = ConversationId::parse(conversation_id) else {
            warn!(conn_id = %origin.id(), "fetchMessages dropped: missing conversationId");
            return;
        };

        match self.repo.recent(&conversation_id, self.history_window).await {
            Ok(messages) => {
                origin.send(ServerEvent::PreviousMessages {
                    conversation_id,
                    messages,
                });
            }
            Err(err) => {
                error!(conversation = %conversation_id, error = %err, "history read failed");
                origin.send(ServerEvent::FetchError {
                    error: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MemoryMessageRepository;
    use tokio::sync::mpsc;

    struct Fixture {
        router: DeliveryRouter<MemoryMessageRepository>,
        registry: Arc<PresenceRegistry>,
        groups: Arc<GroupTable>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(PresenceRegistry::new());
        let groups = Arc::new(GroupTable::new());
        let router = DeliveryRouter::new(
            MemoryMessageRepository::new(),
            registry.clone(),
            groups.clone(),
            50,
        );
        Fixture {
            router,
            registry,
            groups,
        }
    }

    fn connection(
        registry: &PresenceRegistry,
    ) -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);
        registry.register(handle.clone());
        (handle, rx)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn submission(sender: &str, receiver: &str, body: &str) -> MessageSubmission {
        MessageSubmission {
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            body: body.to_string(),
            attachment: None,
        }
    }

    fn expect_message(event: ServerEvent) -> parlor_types::message::Message {
        match event {
            ServerEvent::Message(message) => message,
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_then_fetch_roundtrip() {
        let f = fixture();
        let (sender_conn, mut sender_rx) = connection(&f.registry);

        f.router
            .send(&sender_conn, submission("a", "b", "hello"))
            .await;
        f.router.fetch(&sender_conn, "a-b").await;

        let event = sender_rx.recv().await.unwrap();
        let ServerEvent::PreviousMessages {
            conversation_id,
            messages,
        } = event
        else {
            panic!("expected previousMessages");
        };
        assert_eq!(conversation_id.as_str(), "a-b");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "hello");
        assert_eq!(messages[0].conversation_id.as_str(), "a-b");
    }

    #[tokio::test]
    async fn test_derivation_ignores_submission_order() {
        let f = fixture();
        let (conn, mut rx) = connection(&f.registry);

        // Receiver sorts before sender; derived id is still alphabetical.
        f.router.send(&conn, submission("b", "a", "reverse")).await;
        f.router.fetch(&conn, "a-b").await;

        let ServerEvent::PreviousMessages { messages, .. } = rx.recv().await.unwrap() else {
            panic!("expected previousMessages");
        };
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "reverse");
    }

    #[tokio::test]
    async fn test_group_broadcast_reaches_subscribers() {
        let f = fixture();
        let (sender_conn, mut sender_rx) = connection(&f.registry);
        let (receiver_conn, mut receiver_rx) = connection(&f.registry);

        let conv = ConversationId::of(&user("a"), &user("b"));
        f.groups.join(conv.clone(), sender_conn.id());
        f.groups.join(conv.clone(), receiver_conn.id());

        f.router.send(&sender_conn, submission("a", "b", "hi")).await;

        // Both group members receive it, the sender included.
        assert_eq!(expect_message(sender_rx.recv().await.unwrap()).body, "hi");
        assert_eq!(expect_message(receiver_rx.recv().await.unwrap()).body, "hi");
    }

    #[tokio::test]
    async fn test_direct_delivery_when_receiver_not_in_group() {
        let f = fixture();
        let (sender_conn, _sender_rx) = connection(&f.registry);
        let (receiver_conn, mut receiver_rx) = connection(&f.registry);

        // Receiver is online but never opened this conversation.
        f.registry.announce(user("b"), receiver_conn.id());

        f.router.send(&sender_conn, submission("a", "b", "knock")).await;

        let message = expect_message(receiver_rx.recv().await.unwrap());
        assert_eq!(message.body, "knock");
        // Exactly one copy: direct only, no group membership.
        assert!(receiver_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_duplicate_when_presence_connection_is_group_member() {
        let f = fixture();
        let (sender_conn, _sender_rx) = connection(&f.registry);
        let (receiver_conn, mut receiver_rx) = connection(&f.registry);

        let conv = ConversationId::of(&user("a"), &user("b"));
        f.groups.join(conv, receiver_conn.id());
        f.registry.announce(user("b"), receiver_conn.id());

        f.router.send(&sender_conn, submission("a", "b", "once")).await;

        assert_eq!(expect_message(receiver_rx.recv().await.unwrap()).body, "once");
        assert!(receiver_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dual_channel_duplicate_is_intended() {
        // A receiver subscribed on one connection while present on another
        // receives the message on both channels. The router does not
        // deduplicate; both copies must arrive.
        let f = fixture();
        let (sender_conn, _sender_rx) = connection(&f.registry);
        let (group_conn, mut group_rx) = connection(&f.registry);
        let (presence_conn, mut presence_rx) = connection(&f.registry);

        let conv = ConversationId::of(&user("a"), &user("b"));
        f.groups.join(conv, group_conn.id());
        f.registry.announce(user("b"), presence_conn.id());

        f.router.send(&sender_conn, submission("a", "b", "twice")).await;

        assert_eq!(expect_message(group_rx.recv().await.unwrap()).body, "twice");
        assert_eq!(
            expect_message(presence_rx.recv().await.unwrap()).body,
            "twice"
        );
    }

    #[tokio::test]
    async fn test_offline_receiver_is_noop() {
        let f = fixture();
        let (sender_conn, mut sender_rx) = connection(&f.registry);

        f.router.send(&sender_conn, submission("a", "b", "void")).await;

        // Persisted, but nobody to deliver to and no error for the sender.
        assert_eq!(f.router.repo().len(), 1);
        assert!(sender_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_append_failure_notifies_sender_only() {
        let f = fixture();
        let (sender_conn, mut sender_rx) = connection(&f.registry);
        let (member_conn, mut member_rx) = connection(&f.registry);

        let conv = ConversationId::of(&user("a"), &user("b"));
        f.groups.join(conv, member_conn.id());
        f.registry.announce(user("b"), member_conn.id());
        f.router.repo().set_fail_appends(true);

        f.router.send(&sender_conn, submission("a", "b", "lost")).await;

        let event = sender_rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::MessageError { .. }));
        // No partial delivery of unpersisted messages.
        assert!(member_rx.try_recv().is_err());
        assert!(f.router.repo().is_empty());
    }

    #[tokio::test]
    async fn test_missing_identities_dropped_silently() {
        let f = fixture();
        let (sender_conn, mut sender_rx) = connection(&f.registry);

        f.router.send(&sender_conn, submission("", "b", "x")).await;
        f.router.send(&sender_conn, submission("a", "", "x")).await;

        assert!(f.router.repo().is_empty());
        assert!(sender_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fetch_failure_notifies_requester() {
        let f = fixture();
        let (conn, mut rx) = connection(&f.registry);
        f.router.repo().set_fail_reads(true);

        f.router.fetch(&conn, "a-b").await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::FetchError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_empty_conversation_id_dropped() {
        let f = fixture();
        let (conn, mut rx) = connection(&f.registry);

        f.router.fetch(&conn, "").await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delivery_to_closed_member_is_silent() {
        let f = fixture();
        let (sender_conn, _sender_rx) = connection(&f.registry);
        let (dead_conn, dead_rx) = connection(&f.registry);

        let conv = ConversationId::of(&user("a"), &user("b"));
        f.groups.join(conv, dead_conn.id());
        // The connection task died but cleanup has not run yet.
        drop(dead_rx);

        // Must not panic; the message still persists.
        f.router.send(&sender_conn, submission("a", "b", "late")).await;
        assert_eq!(f.router.repo().len(), 1);
    }
}
