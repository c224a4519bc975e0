//! Concurrent set of currently deliverable connections.
//!
//! [`ConnectionRegistry`] stores every open connection in a `HashMap`
//! keyed by [`ConnectionId`] behind a [`tokio::sync::RwLock`]. The upgrade
//! handler, the per-connection lifecycle tasks and the event watcher all
//! share one registry through an `Arc`.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{Connection, ConnectionId};

/// The authoritative set of connections a broadcast is delivered to.
///
/// # Concurrency
///
/// - `register` and `deregister` take the write lock.
/// - `snapshot` takes the read lock and returns an owned copy, so a
///   broadcast never iterates the live map.
///
/// # Invariants
///
/// - A connection appears at most once.
/// - A removed connection is closed and can never be registered again.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the set.
    ///
    /// Returns `true` if it was newly inserted. Registering a connection
    /// that is already present, or one that has been closed, is a no-op.
    pub async fn register(&self, connection: Connection) -> bool {
        let mut map = self.connections.write().await;
        if !connection.is_open() || map.contains_key(&connection.id()) {
            return false;
        }
        map.insert(connection.id(), connection);
        true
    }

    /// Removes a connection from the set and closes it.
    ///
    /// Returns `true` if the connection was present. Removing an absent
    /// connection is not an error.
    pub async fn deregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(&id);
        match removed {
            Some(connection) => {
                connection.close();
                true
            }
            None => false,
        }
    }

    /// Returns a copy of the current members.
    pub async fn snapshot(&self) -> Vec<Connection> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Returns `true` if a connection with this id is registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Returns the number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
