// ── Truck domain type ──

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::position::Position;

/// Status synthesized for watched trucks missing from the latest batch.
pub const OFFLINE_STATUS: &str = "Offline";
/// Status assumed when the feed omits one.
pub const DEFAULT_STATUS: &str = "In Service";
/// Location text assumed when the feed omits one.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
/// Location text carried by offline placeholders.
pub const PLACEHOLDER_LOCATION: &str = "Details unavailable";
/// `last_update` carried by offline placeholders.
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00.000Z";

/// Naive timestamp layouts seen in municipal feeds, interpreted as local time.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A garbage truck as shown to the user.
///
/// Built fresh from every telemetry batch. `distance` and `is_watched`
/// are derived during reconciliation and are unset straight out of the
/// normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truck {
    /// Uppercase plate number; primary key across refreshes.
    pub id: String,
    pub plate_number: String,
    pub position: Position,
    pub location: String,
    /// ISO-8601 (or feed-native) timestamp of the last observation.
    pub last_update: String,
    pub status: String,
    /// Meters from the reference position. `INFINITY` for placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub is_watched: bool,
}

impl Truck {
    /// Synthesize the sidebar entry for a watched truck the feed omitted.
    pub fn offline_placeholder(id: &str, center: Position) -> Self {
        Self {
            id: id.to_owned(),
            plate_number: id.to_owned(),
            position: center,
            location: PLACEHOLDER_LOCATION.to_owned(),
            last_update: EPOCH_TIMESTAMP.to_owned(),
            status: OFFLINE_STATUS.to_owned(),
            distance: Some(f64::INFINITY),
            is_watched: true,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.status == OFFLINE_STATUS
    }

    /// Distance if it has been computed and is a real number of meters.
    pub fn finite_distance(&self) -> Option<f64> {
        self.distance.filter(|d| d.is_finite())
    }

    /// Parse `last_update` into a UTC instant, if the format is recognized.
    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_update.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS.iter().find_map(|fmt| {
            let naive = NaiveDateTime::parse_from_str(raw, fmt).ok()?;
            Local
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    /// Time elapsed since the last observation. `None` for placeholders
    /// and unparseable timestamps.
    pub fn age(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        if self.is_offline() {
            return None;
        }
        self.last_update_at().map(|at| now - at)
    }
}
