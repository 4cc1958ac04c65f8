//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::message::types::OutboundMessage;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing messages to the client, plus
/// metadata about the connected user. One user may own many handles.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: Uuid,
    /// Username (cached for display)
    pub username: String,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound messages
    sender: mpsc::Sender<OutboundMessage>,
    /// Last inbound activity, unix millis
    last_activity: AtomicI64,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Cancelled when the connection must be torn down
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(user_id: Uuid, username: String, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            username,
            connected_at: now,
            sender,
            last_activity: AtomicI64::new(now.timestamp_millis()),
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// Queue an outbound message without blocking.
    ///
    /// Returns `false` if the message was dropped because the queue is full
    /// or the connection is gone.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark the connection dead and wake whoever is driving its socket.
    pub fn close(&self) {
        self.mark_dead();
        self.closed.cancel();
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        self.last_activity
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Time since the last inbound frame.
    pub fn idle_for(&self) -> Duration {
        let last = self.last_activity.load(Ordering::Relaxed);
        let elapsed = Utc::now().timestamp_millis().saturating_sub(last);
        Duration::from_millis(u64::try_from(elapsed).unwrap_or(0))
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            user_id: self.user_id,
            username: self.username.clone(),
            connected_at: self.connected_at,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// User ID
    pub user_id: Uuid,
    /// Username
    pub username: String,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}
