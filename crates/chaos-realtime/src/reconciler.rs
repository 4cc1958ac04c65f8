//! Disconnect reconciliation: the single cleanup path for a closed
//! connection, whatever closed it (client close, transport error, heartbeat
//! timeout or shutdown).

use std::sync::Arc;

use crate::connection::handle::ConnectionId;
use crate::connection::registry::{ConnectionRegistry, Departure};
use crate::message::types::OutboundMessage;
use crate::metrics::EngineMetrics;
use crate::presence::tracker::PresenceTracker;
use crate::room::router::{Exclude, RoomRouter};
use crate::typing::coordinator::TypingCoordinator;

/// What a reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The connection was unknown; nothing was done.
    Unknown,
    /// The connection was removed; its user still has others.
    ConnectionsRemain,
    /// The user's last connection was removed.
    LastConnectionClosed,
}

/// Cleans up after a connection closes.
#[derive(Debug)]
pub struct DisconnectReconciler {
    registry: Arc<ConnectionRegistry>,
    router: Arc<RoomRouter>,
    typing: TypingCoordinator,
    presence: Arc<PresenceTracker>,
    metrics: Arc<EngineMetrics>,
}

impl DisconnectReconciler {
    /// Create a reconciler over the engine's components.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        router: Arc<RoomRouter>,
        typing: TypingCoordinator,
        presence: Arc<PresenceTracker>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            router,
            typing,
            presence,
            metrics,
        }
    }

    /// Reconcile a closed connection. Calling it again for the same
    /// connection is a no-op.
    pub async fn reconcile(&self, conn_id: ConnectionId) -> ReconcileOutcome {
        let Some(handle) = self.registry.get(&conn_id) else {
            tracing::debug!(%conn_id, "Reconcile for unknown connection");
            return ReconcileOutcome::Unknown;
        };
        handle.close();

        for room_id in self.router.leave_all(conn_id) {
            let left = OutboundMessage::ChannelUserLeft {
                room_id,
                user_id: handle.user_id,
                username: handle.username.clone(),
            };
            self.router.broadcast_to_room(room_id, &left, Exclude::Nobody);
        }

        let outcome = match self.registry.remove(&conn_id) {
            Departure::Unknown => return ReconcileOutcome::Unknown,
            Departure::ConnectionsRemain(_) => ReconcileOutcome::ConnectionsRemain,
            Departure::LastConnection(_) => {
                let stopped = self.typing.clear_actor(handle.user_id);
                if stopped > 0 {
                    tracing::debug!(user_id = %handle.user_id, stopped, "Cleared typing indicators");
                }
                if let Err(e) = self.presence.on_last_disconnect(handle.user_id).await {
                    tracing::warn!(
                        user_id = %handle.user_id,
                        error = %e,
                        "Could not mark user offline; record will lapse by TTL"
                    );
                }
                ReconcileOutcome::LastConnectionClosed
            }
        };

        self.metrics.record_disconnect();
        tracing::info!(
            %conn_id,
            user_id = %handle.user_id,
            outcome = ?outcome,
            "Connection closed"
        );
        outcome
    }
}
