//! Message types for client <-> server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}`.
//! Payload fields use camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chaos_core::error::AppError;

use crate::presence::status::PresenceStatus;
use crate::room::RoomId;
use crate::typing::TypingTarget;

/// Default value for a missing message `type` field.
fn default_message_type() -> String {
    "text".to_string()
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundMessage {
    /// Join a room to receive its channel messages and typing events.
    #[serde(rename = "channel:join", rename_all = "camelCase")]
    ChannelJoin {
        /// Room to join
        room_id: RoomId,
    },
    /// Leave a room.
    #[serde(rename = "channel:leave", rename_all = "camelCase")]
    ChannelLeave {
        /// Room to leave
        room_id: RoomId,
    },
    /// Send a direct message to every device of a user.
    #[serde(rename = "message:direct", rename_all = "camelCase")]
    MessageDirect {
        /// Recipient user
        recipient_id: Uuid,
        /// Message body
        content: String,
        /// Message type (e.g. `text`)
        #[serde(rename = "type", default = "default_message_type")]
        message_type: String,
        /// Client-side correlation ID echoed in the acknowledgement
        #[serde(default)]
        temp_id: Option<String>,
    },
    /// Send a message to every member of a room.
    #[serde(rename = "message:channel", rename_all = "camelCase")]
    MessageChannel {
        /// Target room
        channel_id: RoomId,
        /// Message body
        content: String,
        /// Message type (e.g. `text`)
        #[serde(rename = "type", default = "default_message_type")]
        message_type: String,
        /// Client-side correlation ID echoed in the acknowledgement
        #[serde(default)]
        temp_id: Option<String>,
    },
    /// The sender started (or is still) typing.
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart {
        /// Direct-conversation target
        #[serde(default)]
        recipient_id: Option<Uuid>,
        /// Room target
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    /// The sender stopped typing.
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop {
        /// Direct-conversation target
        #[serde(default)]
        recipient_id: Option<Uuid>,
        /// Room target
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    /// Explicit presence change.
    #[serde(rename = "user:status", rename_all = "camelCase")]
    UserStatus {
        /// New status
        status: PresenceStatus,
        /// Optional free-text status message
        #[serde(default)]
        status_message: Option<String>,
    },
    /// Reply to a server `ping`. The payload is optional.
    #[serde(rename = "pong")]
    Pong(Option<PongPayload>),
}

/// Body of a client `pong`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongPayload {
    /// Echo of the ping timestamp (unix millis)
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl InboundMessage {
    /// Wire name of this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ChannelJoin { .. } => "channel:join",
            Self::ChannelLeave { .. } => "channel:leave",
            Self::MessageDirect { .. } => "message:direct",
            Self::MessageChannel { .. } => "message:channel",
            Self::TypingStart { .. } => "typing:start",
            Self::TypingStop { .. } => "typing:stop",
            Self::UserStatus { .. } => "user:status",
            Self::Pong(_) => "pong",
        }
    }
}

/// Resolve the target of a typing event. Exactly one of the two IDs must be set.
pub fn typing_target(
    recipient_id: Option<Uuid>,
    room_id: Option<RoomId>,
) -> Result<TypingTarget, AppError> {
    match (recipient_id, room_id) {
        (Some(user), None) => Ok(TypingTarget::User(user)),
        (None, Some(room)) => Ok(TypingTarget::Room(room)),
        _ => Err(AppError::validation(
            "Typing events require exactly one of recipientId or roomId",
        )),
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundMessage {
    /// Acknowledges a `channel:join` to the joining connection.
    #[serde(rename = "channel:joined", rename_all = "camelCase")]
    ChannelJoined {
        /// Joined room
        room_id: RoomId,
    },
    /// Another user joined a room this connection belongs to.
    #[serde(rename = "channel:user_joined", rename_all = "camelCase")]
    ChannelUserJoined {
        /// Room
        room_id: RoomId,
        /// Joining user
        user_id: Uuid,
        /// Joining user's name
        username: String,
    },
    /// A user left a room this connection belongs to.
    #[serde(rename = "channel:user_left", rename_all = "camelCase")]
    ChannelUserLeft {
        /// Room
        room_id: RoomId,
        /// Leaving user
        user_id: Uuid,
        /// Leaving user's name
        username: String,
    },
    /// A direct message.
    #[serde(rename = "message:direct", rename_all = "camelCase")]
    MessageDirect {
        /// Server-assigned message ID
        message_id: Uuid,
        /// Sender
        sender_id: Uuid,
        /// Sender's name
        sender_name: String,
        /// Recipient
        recipient_id: Uuid,
        /// Message body
        content: String,
        /// Message type
        #[serde(rename = "type")]
        message_type: String,
        /// Server timestamp
        timestamp: DateTime<Utc>,
    },
    /// A room message.
    #[serde(rename = "message:channel", rename_all = "camelCase")]
    MessageChannel {
        /// Server-assigned message ID
        message_id: Uuid,
        /// Room
        channel_id: RoomId,
        /// Sender
        sender_id: Uuid,
        /// Sender's name
        sender_name: String,
        /// Message body
        content: String,
        /// Message type
        #[serde(rename = "type")]
        message_type: String,
        /// Server timestamp
        timestamp: DateTime<Utc>,
    },
    /// Acknowledges an accepted message to the sending connection.
    #[serde(rename = "message:sent", rename_all = "camelCase")]
    MessageSent {
        /// Echo of the client correlation ID
        temp_id: Option<String>,
        /// Server-assigned message ID
        message_id: Uuid,
        /// Server timestamp
        timestamp: DateTime<Utc>,
    },
    /// A message was rejected.
    #[serde(rename = "message:error", rename_all = "camelCase")]
    MessageError {
        /// Echo of the client correlation ID
        temp_id: Option<String>,
        /// Error code
        code: String,
        /// Human-readable reason
        message: String,
    },
    /// A user started typing.
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart {
        /// Typing user
        user_id: Uuid,
        /// Room, for room-scoped typing
        room_id: Option<RoomId>,
    },
    /// A user stopped typing (explicitly or by expiry).
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop {
        /// Typing user
        user_id: Uuid,
        /// Room, for room-scoped typing
        room_id: Option<RoomId>,
    },
    /// A user's visible presence changed.
    #[serde(rename = "user:status", rename_all = "camelCase")]
    UserStatus {
        /// User
        user_id: Uuid,
        /// Visible status
        status: PresenceStatus,
        /// Status message
        status_message: Option<String>,
        /// Last activity
        last_seen: DateTime<Utc>,
    },
    /// Server heartbeat.
    #[serde(rename = "ping")]
    Ping {
        /// Server time (unix millis)
        timestamp: i64,
    },
    /// A non-message event was rejected.
    #[serde(rename = "error")]
    Error {
        /// Error code
        code: String,
        /// Human-readable reason
        message: String,
    },
}

impl OutboundMessage {
    /// Build an `error` frame from an application error.
    pub fn from_error(err: &AppError) -> Self {
        Self::Error {
            code: err.kind.code().to_string(),
            message: err.message.clone(),
        }
    }

    /// Wire name of this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ChannelJoined { .. } => "channel:joined",
            Self::ChannelUserJoined { .. } => "channel:user_joined",
            Self::ChannelUserLeft { .. } => "channel:user_left",
            Self::MessageDirect { .. } => "message:direct",
            Self::MessageChannel { .. } => "message:channel",
            Self::MessageSent { .. } => "message:sent",
            Self::MessageError { .. } => "message:error",
            Self::TypingStart { .. } => "typing:start",
            Self::TypingStop { .. } => "typing:stop",
            Self::UserStatus { .. } => "user:status",
            Self::Ping { .. } => "ping",
            Self::Error { .. } => "error",
        }
    }
}
