// ── Feed and GPS status enums ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// State of the telemetry feed as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    #[default]
    #[strum(to_string = "Idle")]
    Idle,
    #[strum(to_string = "Updating...")]
    Loading,
    #[strum(to_string = "Connected")]
    Success,
    #[strum(to_string = "Connection Error")]
    Error,
}

/// State of the device position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum GpsStatus {
    /// No fix and no failure yet.
    #[default]
    #[strum(to_string = "Waiting for GPS...")]
    Waiting,
    /// A real fix is current.
    #[strum(to_string = "GPS Active")]
    Active,
    /// Fix was lost after one had been obtained; last position is kept.
    #[strum(to_string = "GPS Error")]
    Error,
    /// No fix was ever obtained; the default center stands in.
    #[strum(to_string = "Using Default Location")]
    Fallback,
}

impl GpsStatus {
    /// A reference point exists and the display list can be built.
    pub fn is_located(&self) -> bool {
        matches!(self, Self::Active | Self::Fallback | Self::Error)
    }
}
