// ── Display-list reconciliation ──
//
// Pure function from (batch, reference point, watch set, search radius)
// to the list the user sees. Holds no state of its own.

use indexmap::IndexMap;

use crate::distance::haversine_m;
use crate::model::{Position, Truck, WatchSet};

/// Everything a recompute reads. Borrowed from the engine's context.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    /// Latest normalized batch, keyed by id in arrival order.
    pub batch: &'a IndexMap<String, Truck>,
    /// Reference point; `None` means the system is not ready.
    pub reference: Option<Position>,
    pub watched: &'a WatchSet,
    pub search_radius_m: u32,
    /// Position carried by offline placeholders.
    pub placeholder_center: Position,
}

/// Build the display list.
///
/// Batch trucks come first in arrival order, each kept only if watched or
/// within the search radius. Watched ids absent from the batch follow as
/// offline placeholders in watch-list order. Trucks that are neither
/// watched nor in range are dropped outright.
pub fn reconcile(input: ReconcileInput<'_>) -> Vec<Truck> {
    let Some(reference) = input.reference else {
        return Vec::new();
    };
    let radius = f64::from(input.search_radius_m);

    let mut trucks: Vec<Truck> = input
        .batch
        .values()
        .filter_map(|truck| {
            let distance = haversine_m(reference, truck.position);
            let is_watched = input.watched.contains(&truck.id);
            (is_watched || distance <= radius).then(|| Truck {
                distance: Some(distance),
                is_watched,
                ..truck.clone()
            })
        })
        .collect();

    trucks.extend(
        input
            .watched
            .iter()
            .filter(|id| !input.batch.contains_key(*id))
            .map(|id| Truck::offline_placeholder(id, input.placeholder_center)),
    );

    trucks
}
