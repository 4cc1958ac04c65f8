//! Rooms: named groups of connections used for fan-out.

pub mod membership;
pub mod router;

pub use router::{Exclude, RoomRouter};

/// Unique room identifier.
pub type RoomId = uuid::Uuid;
