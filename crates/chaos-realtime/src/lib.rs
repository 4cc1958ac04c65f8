//! # chaos-realtime
//!
//! Real-time presence and message fan-out engine for the C.H.A.O.S. chat
//! gateway. Provides:
//!
//! - Connection admission via bearer token (the authentication gate)
//! - A per-process connection registry with multi-device support
//! - Room membership and fan-out to rooms or to every device of a user
//! - Typing indicators with automatic expiry
//! - Presence backed by a shared TTL cache, with disconnect reconciliation

pub mod connection;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod reconciler;
pub mod room;
pub mod server;
pub mod typing;

pub use connection::registry::ConnectionRegistry;
pub use presence::tracker::PresenceTracker;
pub use reconciler::DisconnectReconciler;
pub use room::router::RoomRouter;
pub use server::RealtimeEngine;
pub use typing::coordinator::TypingCoordinator;
