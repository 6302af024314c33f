// ── Proximity alerts ──
//
// An alert fires at most once per truck per refresh cycle. The history
// survives every recompute between fetches and is cleared only when a
// fetch succeeds.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::model::{GpsStatus, Settings, Truck};

/// One "truck is close" event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityAlert {
    pub truck_id: String,
    pub plate_number: String,
    pub distance_m: f64,
}

impl fmt::Display for ProximityAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Truck {} is {:.0}m away!", self.plate_number, self.distance_m)
    }
}

/// Ids already alerted since the last successful fetch.
#[derive(Debug, Clone, Default)]
pub struct AlertHistory {
    alerted: HashSet<String>,
}

impl AlertHistory {
    pub fn contains(&self, id: &str) -> bool {
        self.alerted.contains(id)
    }

    /// Record an id. Returns `false` if it was already recorded.
    pub fn record(&mut self, id: &str) -> bool {
        self.alerted.insert(id.to_owned())
    }

    pub fn clear(&mut self) {
        self.alerted.clear();
    }

    pub fn len(&self) -> usize {
        self.alerted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerted.is_empty()
    }
}

/// Decide which trucks in the display list warrant an alert.
///
/// Nothing fires while muted or while the reference point is not a live
/// GPS fix. Alerted ids are written into `history`.
pub fn evaluate_alerts(
    trucks: &[Truck],
    gps: GpsStatus,
    settings: &Settings,
    history: &mut AlertHistory,
) -> Vec<ProximityAlert> {
    if settings.muted || gps != GpsStatus::Active {
        return Vec::new();
    }

    let radius = f64::from(settings.alert_radius_m);
    trucks
        .iter()
        .filter(|t| !t.is_offline())
        .filter_map(|t| t.finite_distance().map(|d| (t, d)))
        .filter(|(_, d)| *d <= radius)
        .filter(|(t, _)| history.record(&t.id))
        .map(|(t, d)| ProximityAlert {
            truck_id: t.id.clone(),
            plate_number: t.plate_number.clone(),
            distance_m: d,
        })
        .collect()
}
