//! Wire messages exchanged over the WebSocket, plus validation and codec.

pub mod codec;
pub mod types;
pub mod validator;

pub use types::{InboundMessage, OutboundMessage};
