//! The shared presence record stored per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::PresenceStatus;
use crate::message::types::OutboundMessage;

/// A user's presence as stored in the shared cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// User
    pub user_id: Uuid,
    /// Current status
    pub status: PresenceStatus,
    /// Optional free-text status message
    pub status_message: Option<String>,
    /// Last time the status was written
    pub last_seen: DateTime<Utc>,
}

impl PresenceRecord {
    /// A fresh record stamped with the current time.
    pub fn new(user_id: Uuid, status: PresenceStatus, status_message: Option<String>) -> Self {
        Self {
            user_id,
            status,
            status_message,
            last_seen: Utc::now(),
        }
    }

    /// The record as other users may see it: INVISIBLE reads as OFFLINE,
    /// and an invisible user's status message is hidden.
    pub fn visible_to_others(&self) -> Self {
        match self.status {
            PresenceStatus::Invisible => Self {
                status: PresenceStatus::Offline,
                status_message: None,
                ..self.clone()
            },
            _ => self.clone(),
        }
    }

    /// The `user:status` event announcing this record to other users.
    pub fn to_event(&self) -> OutboundMessage {
        let visible = self.visible_to_others();
        OutboundMessage::UserStatus {
            user_id: visible.user_id,
            status: visible.status,
            status_message: visible.status_message,
            last_seen: visible.last_seen,
        }
    }
}
