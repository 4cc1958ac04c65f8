//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total messages enqueued to clients
    pub messages_sent: AtomicU64,
    /// Total frames received from clients
    pub messages_received: AtomicU64,
    /// Messages dropped because a client queue was full or closed
    pub messages_dropped: AtomicU64,
    /// Inbound frames rejected by validation
    pub events_rejected: AtomicU64,
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Connections currently active
    pub connections_active: AtomicU64,
    /// Total room joins
    pub room_joins_total: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message enqueued to a client
    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message dropped for a client
    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame received from a client
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected inbound frame
    pub fn record_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a new connection
    pub fn record_connect(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection
    pub fn record_disconnect(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a room join
    pub fn record_room_join(&self) {
        self.room_joins_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            room_joins_total: self.room_joins_total.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total messages enqueued to clients
    pub messages_sent: u64,
    /// Total frames received from clients
    pub messages_received: u64,
    /// Messages dropped on full or closed queues
    pub messages_dropped: u64,
    /// Inbound frames rejected by validation
    pub events_rejected: u64,
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently active connections
    pub connections_active: u64,
    /// Total room joins
    pub room_joins_total: u64,
}
