//! Room router: room membership and message fan-out.
//!
//! Delivery is best-effort: one non-blocking enqueue per recipient queue.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::RoomId;
use super::membership::MembershipIndex;
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::registry::ConnectionRegistry;
use crate::message::types::OutboundMessage;
use crate::metrics::EngineMetrics;

/// Which recipients a fan-out skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclude {
    /// Deliver to everyone.
    Nobody,
    /// Skip one connection (usually the sender's).
    Connection(ConnectionId),
    /// Skip every connection of one user.
    User(Uuid),
}

impl Exclude {
    fn skips(&self, handle: &ConnectionHandle) -> bool {
        match self {
            Self::Nobody => false,
            Self::Connection(id) => handle.id == *id,
            Self::User(id) => handle.user_id == *id,
        }
    }
}

/// Routes messages to rooms, users, or every connection in the process.
#[derive(Debug)]
pub struct RoomRouter {
    /// Room ID → member connections.
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    /// Connection ID → joined rooms.
    memberships: MembershipIndex,
    /// Live connections.
    registry: Arc<ConnectionRegistry>,
    /// Delivery counters.
    metrics: Arc<EngineMetrics>,
}

impl RoomRouter {
    /// Creates a new router over the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            rooms: DashMap::new(),
            memberships: MembershipIndex::new(),
            registry,
            metrics,
        }
    }

    /// Adds a connection to a room. Returns `false` if it was already a member.
    pub fn join(&self, conn_id: ConnectionId, room_id: RoomId) -> bool {
        let joined = self.rooms.entry(room_id).or_default().insert(conn_id);
        if joined {
            self.memberships.add(conn_id, room_id);
            self.metrics.record_room_join();
            tracing::debug!(%conn_id, %room_id, "Joined room");
        }
        joined
    }

    /// Removes a connection from a room. Returns `false` if it was not a member.
    pub fn leave(&self, conn_id: ConnectionId, room_id: RoomId) -> bool {
        let left = self.remove_member(conn_id, &room_id);
        if left {
            self.memberships.remove(conn_id, &room_id);
            tracing::debug!(%conn_id, %room_id, "Left room");
        }
        left
    }

    /// Removes a connection from every room it joined.
    pub fn leave_all(&self, conn_id: ConnectionId) -> Vec<RoomId> {
        self.memberships
            .remove_all(conn_id)
            .into_iter()
            .filter(|room_id| self.remove_member(conn_id, room_id))
            .collect()
    }

    fn remove_member(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(mut members) => members.remove(&conn_id),
            None => false,
        };
        self.rooms.remove_if(room_id, |_, members| members.is_empty());
        removed
    }

    /// Current members of a room.
    pub fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rooms a connection has joined.
    pub fn rooms_of(&self, conn_id: ConnectionId) -> Vec<RoomId> {
        self.memberships.rooms_of(conn_id).into_iter().collect()
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Sends a message to every member of a room. Returns the number of
    /// connections it was enqueued on.
    pub fn broadcast_to_room(&self, room_id: RoomId, msg: &OutboundMessage, exclude: Exclude) -> usize {
        let recipients = self
            .members_of(&room_id)
            .into_iter()
            .filter_map(|conn_id| self.registry.get(&conn_id));
        self.deliver(recipients, msg, exclude)
    }

    /// Sends a message to every live connection of a user.
    pub fn deliver_to_user(&self, user_id: Uuid, msg: &OutboundMessage) -> usize {
        let recipients = self.registry.connections_of(&user_id).into_iter();
        self.deliver(recipients, msg, Exclude::Nobody)
    }

    /// Sends a message to every live connection in this process.
    pub fn broadcast_all(&self, msg: &OutboundMessage, exclude: Exclude) -> usize {
        let recipients = self.registry.all_connections().into_iter();
        self.deliver(recipients, msg, exclude)
    }

    fn deliver(
        &self,
        recipients: impl Iterator<Item = Arc<ConnectionHandle>>,
        msg: &OutboundMessage,
        exclude: Exclude,
    ) -> usize {
        let mut delivered = 0;
        for handle in recipients.filter(|h| !exclude.skips(h)) {
            if handle.send(msg.clone()) {
                delivered += 1;
                self.metrics.record_sent();
            } else {
                self.metrics.record_dropped();
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        router: RoomRouter,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(ConnectionRegistry::new());
            let router = RoomRouter::new(registry.clone(), Arc::new(EngineMetrics::new()));
            Self { registry, router }
        }

        fn connect(&self, user_id: Uuid) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
            let (tx, rx) = mpsc::channel(8);
            let handle = Arc::new(ConnectionHandle::new(user_id, "user".into(), tx));
            self.registry.add(handle.clone());
            (handle, rx)
        }
    }

    fn ping() -> OutboundMessage {
        OutboundMessage::Ping { timestamp: 0 }
    }

    #[test]
    fn test_join_and_leave_are_idempotent() {
        let f = Fixture::new();
        let (a, _rx) = f.connect(Uuid::new_v4());
        let room = Uuid::new_v4();

        assert!(f.router.join(a.id, room));
        assert!(!f.router.join(a.id, room));
        assert_eq!(f.router.members_of(&room), vec![a.id]);
        assert_eq!(f.router.rooms_of(a.id), vec![room]);

        assert!(f.router.leave(a.id, room));
        assert!(!f.router.leave(a.id, room));
        assert_eq!(f.router.room_count(), 0);
        assert!(f.router.rooms_of(a.id).is_empty());
    }

    #[test]
    fn test_leave_all_returns_every_room() {
        let f = Fixture::new();
        let (a, _rx) = f.connect(Uuid::new_v4());
        let (b, _rx_b) = f.connect(Uuid::new_v4());
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        f.router.join(a.id, r1);
        f.router.join(a.id, r2);
        f.router.join(b.id, r2);

        let mut left = f.router.leave_all(a.id);
        left.sort();
        let mut expected = vec![r1, r2];
        expected.sort();
        assert_eq!(left, expected);
        assert_eq!(f.router.members_of(&r2), vec![b.id]);
        assert_eq!(f.router.room_count(), 1);
        assert!(f.router.leave_all(a.id).is_empty());
    }

    #[test]
    fn test_room_broadcast_excludes_sender_connection() {
        let f = Fixture::new();
        let alice = Uuid::new_v4();
        let (a1, mut rx_a1) = f.connect(alice);
        let (a2, mut rx_a2) = f.connect(alice);
        let (b, mut rx_b) = f.connect(Uuid::new_v4());
        let room = Uuid::new_v4();
        for conn in [&a1, &a2, &b] {
            f.router.join(conn.id, room);
        }

        assert_eq!(f.router.broadcast_to_room(room, &ping(), Exclude::Connection(a1.id)), 2);
        assert!(rx_a1.try_recv().is_err());
        assert!(rx_a2.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());

        assert_eq!(f.router.broadcast_to_room(room, &ping(), Exclude::User(alice)), 1);
        assert!(rx_a2.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_deliver_to_user_reaches_every_device() {
        let f = Fixture::new();
        let bob = Uuid::new_v4();
        let (_b1, mut rx1) = f.connect(bob);
        let (_b2, mut rx2) = f.connect(bob);
        let (_c, mut rx_c) = f.connect(Uuid::new_v4());

        assert_eq!(f.router.deliver_to_user(bob, &ping()), 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
        assert_eq!(f.router.deliver_to_user(Uuid::new_v4(), &ping()), 0);
    }

    #[test]
    fn test_full_queue_does_not_block_others() {
        let f = Fixture::new();
        let (tx, _slow_rx) = mpsc::channel(1);
        let slow = Arc::new(ConnectionHandle::new(Uuid::new_v4(), "slow".into(), tx));
        f.registry.add(slow.clone());
        let (fast, mut fast_rx) = f.connect(Uuid::new_v4());
        let room = Uuid::new_v4();
        f.router.join(slow.id, room);
        f.router.join(fast.id, room);

        assert_eq!(f.router.broadcast_to_room(room, &ping(), Exclude::Nobody), 2);
        assert_eq!(f.router.broadcast_to_room(room, &ping(), Exclude::Nobody), 1);
        assert!(fast_rx.try_recv().is_ok());
        assert!(fast_rx.try_recv().is_ok());
    }
}
