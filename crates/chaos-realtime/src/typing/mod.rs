//! Typing indicators.

pub mod coordinator;

pub use coordinator::TypingCoordinator;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::RoomId;

/// Who a typing indicator is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypingTarget {
    /// A direct conversation with one user.
    User(Uuid),
    /// A room.
    Room(RoomId),
}
