//! In-memory presence registry.
//!
//! One coarse lock protects the whole table: the roster of live
//! connections, the user -> connection mapping, and its reverse. All
//! announce/withdraw/lookup operations are serialized against each other,
//! which is what makes the reconnect race resolvable (an old socket
//! closing after a newer one announced must not clear the newer mapping).
//!
//! The lock is never held across channel writes: mutations return a
//! [`RosterSnapshot`] taken inside the critical section, and the caller
//! broadcasts from the snapshot after the lock is released.
//!
//! State is scoped to the process lifetime. It only reflects live sockets,
//! so it is rebuilt empty on restart and never persisted.

use std::collections::HashMap;
use std::sync::Mutex;

use parlor_types::event::ServerEvent;
use parlor_types::user::UserId;

use crate::session::{ConnectionHandle, ConnectionId};

/// At most one presence entry per user: last connect wins. A user
/// connecting from a second device replaces the first device's mapping.
#[derive(Default)]
struct Table {
    /// Every live connection, bound or not. Targets of roster broadcasts.
    connections: HashMap<ConnectionId, ConnectionHandle>,
    by_user: HashMap<UserId, ConnectionId>,
    by_conn: HashMap<ConnectionId, UserId>,
}

/// Recipient set and online list captured under the lock.
///
/// Broadcasting the roster to N connections happens entirely outside the
/// critical section; a handle whose connection died in the meantime drops
/// the event silently.
pub struct RosterSnapshot {
    online: Vec<UserId>,
    recipients: Vec<ConnectionHandle>,
}

impl RosterSnapshot {
    /// Online user ids, sorted for stable output.
    pub fn online(&self) -> &[UserId] {
        &self.online
    }

    /// Push the `onlineUsers` event to every live connection.
    pub fn broadcast(self) {
        for handle in &self.recipients {
            handle.send(ServerEvent::OnlineUsers {
                users: self.online.clone(),
            });
        }
    }
}

/// Process-wide registry of live connections and their identities.
pub struct PresenceRegistry {
    table: Mutex<Table>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table::default()),
        }
    }

    /// Add a freshly opened connection to the roster.
    pub fn register(&self, handle: ConnectionHandle) {
        let mut table = self.table.lock().expect("presence lock poisoned");
        table.connections.insert(handle.id(), handle);
    }

    /// Bind `user` to `conn`, superseding any prior connection for that
    /// user. The superseded connection's reverse link is dropped here, so
    /// its eventual withdrawal cannot touch the new mapping.
    pub fn announce(&self, user: UserId, conn: ConnectionId) -> RosterSnapshot {
        let mut table = self.table.lock().expect("presence lock poisoned");
        if let Some(previous) = table.by_user.insert(user.clone(), conn) {
            if previous != conn {
                table.by_conn.remove(&previous);
                tracing::debug!(user = %user, "presence superseded by newer connection");
            }
        }
        table.by_conn.insert(conn, user);
        snapshot(&table)
    }

    /// Remove the presence entry owned by `conn`, if it still owns one.
    ///
    /// Returns `None` when there is nothing to broadcast: the connection
    /// never announced, or its entry was already superseded by a newer
    /// announce for the same user (the reconnect race; the newer mapping
    /// must survive).
    pub fn withdraw(&self, conn: ConnectionId) -> Option<RosterSnapshot> {
        let mut table = self.table.lock().expect("presence lock poisoned");
        let Some(user) = table.by_conn.remove(&conn) else {
            tracing::debug!(conn_id = %conn, "withdraw ignored: no presence entry for connection");
            return None;
        };
        if table.by_user.get(&user) == Some(&conn) {
            table.by_user.remove(&user);
        }
        Some(snapshot(&table))
    }

    /// Drop a closed connection from the roster and withdraw its presence
    /// entry in one critical section.
    pub fn disconnect(&self, conn: ConnectionId) -> Option<RosterSnapshot> {
        let mut table = self.table.lock().expect("presence lock poisoned");
        table.connections.remove(&conn);
        let Some(user) = table.by_conn.remove(&conn) else {
            return None;
        };
        if table.by_user.get(&user) == Some(&conn) {
            table.by_user.remove(&user);
        }
        Some(snapshot(&table))
    }

    /// Resolve a user's active connection handle, if any.
    pub fn lookup(&self, user: &UserId) -> Option<ConnectionHandle> {
        let table = self.table.lock().expect("presence lock poisoned");
        let conn = table.by_user.get(user)?;
        table.connections.get(conn).cloned()
    }

    /// Resolve a connection id to its handle (used for group delivery).
    pub fn handle(&self, conn: &ConnectionId) -> Option<ConnectionHandle> {
        let table = self.table.lock().expect("presence lock poisoned");
        table.connections.get(conn).cloned()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot(table: &Table) -> RosterSnapshot {
    let mut online: Vec<UserId> = table.by_user.keys().cloned().collect();
    online.sort();
    RosterSnapshot {
        online,
        recipients: table.connections.values().cloned().collect(),
    }
}
