//! Broadcast-group membership table.
//!
//! A broadcast group is the set of connections that have explicitly
//! subscribed to a conversation id. Membership is keyed per conversation
//! (DashMap shards the locking), and the reverse index lives in each
//! connection's session, which drives [`GroupTable::leave_all`] on
//! disconnect.

use std::collections::HashSet;

use dashmap::DashMap;

use parlor_types::conversation::ConversationId;

use crate::session::ConnectionId;

/// Conversation id -> subscribed connections.
pub struct GroupTable {
    groups: DashMap<ConversationId, HashSet<ConnectionId>>,
}

impl GroupTable {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Subscribe a connection to a conversation's group. Idempotent.
    pub fn join(&self, conversation: ConversationId, conn: ConnectionId) {
        self.groups.entry(conversation).or_default().insert(conn);
    }

    /// Unsubscribe a connection from one group. Empty groups are removed.
    pub fn leave(&self, conversation: &ConversationId, conn: ConnectionId) {
        if let Some(mut members) = self.groups.get_mut(conversation) {
            members.remove(&conn);
            if members.is_empty() {
                drop(members);
                self.groups.remove_if(conversation, |_, m| m.is_empty());
            }
        }
    }

    /// Snapshot of a group's current members.
    pub fn members(&self, conversation: &ConversationId) -> Vec<ConnectionId> {
        self.groups
            .get(conversation)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove a disconnecting connection from every group it joined.
    pub fn leave_all<'a>(
        &self,
        conn: ConnectionId,
        joined: impl IntoIterator<Item = &'a ConversationId>,
    ) {
        for conversation in joined {
            self.leave(conversation, conn);
        }
    }
}

impl Default for GroupTable {
    fn default() -> Self {
        Self::new()
    }
}
