//! Per-connection state: the outbound handle and the session record.
//!
//! Each WebSocket connection owns exactly one [`ConnectionSession`] for its
//! lifetime. The session tracks the optional identity binding (bind-once)
//! and the set of conversation groups the connection has joined, which
//! drives group cleanup on disconnect.

use std::collections::HashSet;
use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use parlor_types::conversation::ConversationId;
use parlor_types::event::ServerEvent;
use parlor_types::user::UserId;

/// Unique id of a live connection. Not stable across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Cheap, cloneable handle for pushing events at a connection.
///
/// Wraps the connection's outbound channel. Sending to a connection that
/// has already gone away is a silent no-op: the write side of a dead
/// channel fails, and delivery snapshots may legitimately contain handles
/// whose connection closed in the meantime.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event for this connection. Never fails: a closed channel
    /// means the connection is gone and the event is dropped.
    pub fn send(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(conn_id = %self.id, "dropping event for closed connection");
        }
    }
}

/// State of a single connection: bound identity and joined conversations.
///
/// Identity binding is irreversible for the connection's lifetime.
/// Joining conversations is repeatable and valid in bound or unbound state.
pub struct ConnectionSession {
    handle: ConnectionHandle,
    identity: Option<UserId>,
    joined: HashSet<ConversationId>,
}

impl ConnectionSession {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            identity: None,
            joined: HashSet::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    /// Bind this connection to an identity.
    ///
    /// Returns `false` if the connection is already bound to a *different*
    /// identity; re-announcing the same identity is accepted (clients
    /// re-send `join` after transport hiccups).
    pub fn bind(&mut self, user: UserId) -> bool {
        match &self.identity {
            None => {
                self.identity = Some(user);
                true
            }
            Some(existing) => *existing == user,
        }
    }

    /// Record a group subscription. Returns `true` if it was new.
    pub fn record_join(&mut self, conversation: ConversationId) -> bool {
        self.joined.insert(conversation)
    }

    /// Conversations this connection subscribed to, for disconnect cleanup.
    pub fn joined(&self) -> impl Iterator<Item = &ConversationId> {
        self.joined.iter()
    }
}
