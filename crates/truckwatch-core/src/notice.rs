// ── User-facing notices ──
//
// Short, transient messages the presentation layer shows as they happen.
// Muting silences everything except the mute toggle itself and GPS
// notices; the tracker applies that rule before publishing.

use std::fmt;

use serde::Serialize;

use crate::engine::ProximityAlert;

/// Whether a notice reports good news or a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    Proximity(ProximityAlert),
    FetchFailed,
    GpsFallback,
    GpsLost,
    WatchAdded { id: String, manual: bool },
    WatchRemoved { id: String },
    AlreadyWatched { id: String },
    OfflineSelected { id: String },
    Muted,
    Unmuted,
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::Proximity(_)
            | Self::WatchAdded { .. }
            | Self::WatchRemoved { .. }
            | Self::Unmuted => NoticeLevel::Info,
            Self::FetchFailed
            | Self::GpsFallback
            | Self::GpsLost
            | Self::AlreadyWatched { .. }
            | Self::OfflineSelected { .. }
            | Self::Muted => NoticeLevel::Warning,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proximity(alert) => fmt::Display::fmt(alert, f),
            Self::FetchFailed => f.write_str("Failed to update truck data."),
            Self::GpsFallback => f.write_str("GPS Error. Using default location."),
            Self::GpsLost => f.write_str("GPS signal lost or error."),
            Self::WatchAdded { id, manual: true } => {
                write!(f, "Truck {id} manually added to watch list!")
            }
            Self::WatchAdded { id, manual: false } => write!(f, "Truck {id} added to watch list!"),
            Self::WatchRemoved { id } => write!(f, "Truck {id} removed from watch list."),
            Self::AlreadyWatched { id } => write!(f, "Truck {id} is already on your watch list."),
            Self::OfflineSelected { id } => {
                write!(f, "Truck {id} is offline and cannot be selected on map.")
            }
            Self::Muted => f.write_str("Notifications muted."),
            Self::Unmuted => f.write_str("Notifications unmuted."),
        }
    }
}
