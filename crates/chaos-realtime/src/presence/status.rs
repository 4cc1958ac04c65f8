//! Presence status definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use chaos_core::error::AppError;

/// User presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PresenceStatus {
    /// Connected and available.
    #[serde(alias = "online")]
    Online,
    /// Connected but away.
    #[serde(alias = "away")]
    Away,
    /// Do not disturb.
    #[serde(alias = "busy")]
    Busy,
    /// Connected, but shown to others as offline.
    #[serde(alias = "invisible")]
    Invisible,
    /// Not connected anywhere.
    #[serde(alias = "offline")]
    Offline,
}

impl PresenceStatus {
    /// Converts to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Away => "AWAY",
            Self::Busy => "BUSY",
            Self::Invisible => "INVISIBLE",
            Self::Offline => "OFFLINE",
        }
    }

    /// The status other users are allowed to see.
    pub fn visible(self) -> Self {
        match self {
            Self::Invisible => Self::Offline,
            other => other,
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ONLINE" => Ok(Self::Online),
            "AWAY" => Ok(Self::Away),
            "BUSY" => Ok(Self::Busy),
            "INVISIBLE" => Ok(Self::Invisible),
            "OFFLINE" => Ok(Self::Offline),
            other => Err(AppError::validation(format!("Unknown presence status: '{other}'"))),
        }
    }
}
