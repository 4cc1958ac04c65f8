//! Connection registry: tracks every live connection in this process,
//! indexed by connection ID and by user.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::handle::{ConnectionHandle, ConnectionId};

/// Outcome of registering a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The user had no other live connection in this process.
    FirstConnection,
    /// The user already had at least one live connection.
    AdditionalConnection,
}

/// Outcome of removing a connection.
#[derive(Debug, Clone)]
pub enum Departure {
    /// The removed connection was the user's last one.
    LastConnection(Arc<ConnectionHandle>),
    /// The user still has other live connections.
    ConnectionsRemain(Arc<ConnectionHandle>),
    /// The connection was not registered (already removed).
    Unknown,
}

/// Thread-safe registry of all active WebSocket connections.
///
/// The first/last-connection decision is taken under the same map-shard
/// lock as the mutation, so two concurrent connects (or disconnects) for
/// one user can never both observe "first" (or "last").
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// User ID → that user's connections.
    by_user: DashMap<Uuid, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection.
    pub fn add(&self, handle: Arc<ConnectionHandle>) -> Arrival {
        self.by_id.insert(handle.id, handle.clone());

        let mut connections = self.by_user.entry(handle.user_id).or_default();
        let arrival = if connections.is_empty() {
            Arrival::FirstConnection
        } else {
            Arrival::AdditionalConnection
        };
        connections.push(handle);
        arrival
    }

    /// Removes a connection. Safe to call more than once.
    pub fn remove(&self, conn_id: &ConnectionId) -> Departure {
        let Some((_, handle)) = self.by_id.remove(conn_id) else {
            return Departure::Unknown;
        };

        match self.by_user.entry(handle.user_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().retain(|c| c.id != *conn_id);
                if entry.get().is_empty() {
                    entry.remove();
                    Departure::LastConnection(handle)
                } else {
                    Departure::ConnectionsRemain(handle)
                }
            }
            Entry::Vacant(_) => Departure::LastConnection(handle),
        }
    }

    /// Gets all connections for a user.
    pub fn connections_of(&self, user_id: &Uuid) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every live connection.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id.iter().map(|entry| entry.value().clone()).collect()
    }

    /// IDs of every user with at least one live connection.
    pub fn connected_user_ids(&self) -> Vec<Uuid> {
        self.by_user.iter().map(|entry| *entry.key()).collect()
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Checks whether a user has any live connection.
    pub fn is_user_connected(&self, user_id: &Uuid) -> bool {
        self.by_user.contains_key(user_id)
    }
}
