// ── Presentation helpers ──
//
// Pure functions over a display list. Neither changes which trucks are
// present; they only order or narrow what the user looks at.

use std::cmp::Ordering;

use crate::model::Truck;

/// Stable presentation order: watched first, online before offline, then
/// nearest first. Unknown and infinite distances sort last; ties keep the
/// incoming order.
pub fn sort_for_display(trucks: &mut [Truck]) {
    trucks.sort_by(|a, b| {
        b.is_watched
            .cmp(&a.is_watched)
            .then_with(|| a.is_offline().cmp(&b.is_offline()))
            .then_with(|| cmp_distance(a.finite_distance(), b.finite_distance()))
    });
}

fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-insensitive substring match over plate and location.
///
/// The text is used as typed, surrounding spaces included. Empty text
/// matches everything.
pub fn search<'a>(trucks: &'a [Truck], text: &str) -> Vec<&'a Truck> {
    let needle = text.to_lowercase();
    if needle.is_empty() {
        return trucks.iter().collect();
    }
    trucks
        .iter()
        .filter(|t| {
            t.plate_number.to_lowercase().contains(&needle)
                || t.location.to_lowercase().contains(&needle)
        })
        .collect()
}
