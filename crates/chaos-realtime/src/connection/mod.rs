//! WebSocket connection management: admission, handles, registry, heartbeat.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod registry;

pub use handle::{ConnectionHandle, ConnectionId};
pub use registry::ConnectionRegistry;
