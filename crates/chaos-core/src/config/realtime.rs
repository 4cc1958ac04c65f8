//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Extra time after a missed ping before the connection is dropped.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Maximum message content length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Presence store settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Typing indicator settings.
    #[serde(default)]
    pub typing: TypingConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            max_message_length: default_max_message_length(),
            presence: PresenceConfig::default(),
            typing: TypingConfig::default(),
        }
    }
}

/// Presence record lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// TTL of an ONLINE record; it lapses unless refreshed.
    #[serde(default = "default_presence_ttl")]
    pub ttl_seconds: u64,
    /// TTL of records in any other status (keeps `lastSeen` around).
    #[serde(default = "default_presence_retention")]
    pub retention_seconds: u64,
    /// How often ONLINE records of locally connected users are refreshed.
    #[serde(default = "default_presence_refresh")]
    pub refresh_interval_seconds: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_presence_ttl(),
            retention_seconds: default_presence_retention(),
            refresh_interval_seconds: default_presence_refresh(),
        }
    }
}

/// Typing indicator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    /// How long a typing indicator lives without a refresh, in milliseconds.
    #[serde(default = "default_typing_window")]
    pub window_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            window_ms: default_typing_window(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    10
}

fn default_max_message_length() -> usize {
    4000
}

fn default_presence_ttl() -> u64 {
    60
}

fn default_presence_retention() -> u64 {
    86_400
}

fn default_presence_refresh() -> u64 {
    20
}

fn default_typing_window() -> u64 {
    5000
}
