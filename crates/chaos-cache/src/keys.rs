//! Cache key builders for every gateway cache entry.

use uuid::Uuid;

/// Prefix applied to all gateway cache keys.
const PREFIX: &str = "chaos";

// ── Presence keys ──────────────────────────────────────────

/// Cache key for a user's presence record.
pub fn presence_record(user_id: Uuid) -> String {
    format!("{PREFIX}:presence:{user_id}")
}

/// Cache key for the set of user IDs whose status is ONLINE.
pub fn presence_online_index() -> String {
    format!("{PREFIX}:presence:online")
}

// ── Token keys ─────────────────────────────────────────────

/// Cache key for a revoked JWT ID.
pub fn jwt_blocklist(jti: Uuid) -> String {
    format!("{PREFIX}:jwt:blocklist:{jti}")
}
