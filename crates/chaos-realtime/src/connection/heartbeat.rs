//! Ping heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use chaos_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Grace period after a missed interval before the connection is dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds),
        }
    }
}

/// Run the heartbeat loop for a connection.
///
/// Sends a `ping` every interval. Any inbound frame counts as activity; a
/// connection silent for longer than interval + timeout is closed, which
/// hands it to the normal disconnect path.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    let deadline = config.ping_interval + config.ping_timeout;

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            _ = interval.tick() => {}
        }

        let idle = handle.idle_for();
        if idle > deadline {
            tracing::warn!(
                conn_id = %handle.id,
                user_id = %handle.user_id,
                idle_ms = idle.as_millis() as u64,
                "Heartbeat timeout, closing connection"
            );
            handle.close();
            break;
        }

        let ping = OutboundMessage::Ping {
            timestamp: Utc::now().timestamp_millis(),
        };
        if !handle.send(ping) && !handle.is_alive() {
            tracing::debug!(conn_id = %handle.id, "Ping send failed, closing connection");
            handle.close();
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
