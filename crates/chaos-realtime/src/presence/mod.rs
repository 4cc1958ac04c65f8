//! Presence: per-user status shared across processes through the cache.

pub mod record;
pub mod refresher;
pub mod status;
pub mod store;
pub mod tracker;

pub use record::PresenceRecord;
pub use status::PresenceStatus;
pub use store::{PresenceStore, RefreshOutcome};
pub use tracker::PresenceTracker;
