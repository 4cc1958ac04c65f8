//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chaos_realtime::presence::{PresenceRecord, PresenceStatus};

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    /// Greeting.
    pub message: String,
    /// Always `operational` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Deployment environment.
    pub environment: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
    /// Presence store status.
    pub cache: String,
    /// WebSocket connections held by this process.
    pub ws_connections: usize,
    /// Distinct users connected to this process.
    pub online_users: usize,
}

/// Body of `GET /api/presence/online`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUsersResponse {
    /// Users whose status is ONLINE.
    pub user_ids: Vec<Uuid>,
    /// Number of online users.
    pub count: usize,
}

/// A user's presence as other users see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    /// User.
    pub user_id: Uuid,
    /// Visible status.
    pub status: PresenceStatus,
    /// Status message, if visible.
    pub status_message: Option<String>,
    /// Last activity, if the user has ever been seen.
    pub last_seen: Option<DateTime<Utc>>,
}

impl PresenceResponse {
    /// The response for a user with no stored record.
    pub fn offline(user_id: Uuid) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Offline,
            status_message: None,
            last_seen: None,
        }
    }
}

impl From<PresenceRecord> for PresenceResponse {
    fn from(record: PresenceRecord) -> Self {
        let visible = record.visible_to_others();
        Self {
            user_id: visible.user_id,
            status: visible.status,
            status_message: visible.status_message,
            last_seen: Some(visible.last_seen),
        }
    }
}
