// ── Raw record normalization ──
//
// Turns loosely-typed feed records into `Truck`s. The feed has used
// several field names for the same datum over time, so each field is
// resolved from a priority list of alternate keys. A record that cannot
// yield a plate and a finite coordinate pair is dropped, never fatal.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::trace;
use truckwatch_api::RawRecord;

use crate::model::{DEFAULT_STATUS, Position, Truck, UNKNOWN_LOCATION, normalize_id};

const PLATE_KEYS: &[&str] = &["car", "plateNumber", "id"];
const LNG_KEYS: &[&str] = &["x", "lng", "longitude", "lon"];
const LAT_KEYS: &[&str] = &["y", "lat", "latitude"];
const LOCATION_KEYS: &[&str] = &["location", "address"];
const TIME_KEYS: &[&str] = &["time", "updateTime"];
const STATUS_KEYS: &[&str] = &["status"];

/// Normalize one record. `now` stamps records without a timestamp.
///
/// The returned truck is unwatched and has no distance; reconciliation
/// fills both in.
pub fn normalize_record(record: &RawRecord, now: DateTime<Utc>) -> Option<Truck> {
    let id = first_text(record, PLATE_KEYS).and_then(|plate| normalize_id(&plate))?;
    let lng = first_populated(record, LNG_KEYS).and_then(parse_coordinate)?;
    let lat = first_populated(record, LAT_KEYS).and_then(parse_coordinate)?;

    Some(Truck {
        plate_number: id.clone(),
        id,
        position: Position::new(lat, lng),
        location: first_text(record, LOCATION_KEYS).unwrap_or_else(|| UNKNOWN_LOCATION.into()),
        last_update: first_text(record, TIME_KEYS)
            .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        status: first_text(record, STATUS_KEYS).unwrap_or_else(|| DEFAULT_STATUS.into()),
        distance: None,
        is_watched: false,
    })
}

/// Normalize a whole batch, silently dropping records that fail.
pub fn normalize_batch(records: &[RawRecord], now: DateTime<Utc>) -> Vec<Truck> {
    let trucks: Vec<Truck> = records
        .iter()
        .filter_map(|r| normalize_record(r, now))
        .collect();
    if trucks.len() < records.len() {
        trace!(
            dropped = records.len() - trucks.len(),
            kept = trucks.len(),
            "dropped malformed telemetry records"
        );
    }
    trucks
}

// ── Helpers ────────────────────────────────────────────────────────

/// A value counts as populated when it is a number, a bool, or a string
/// that is non-empty after trimming.
fn is_populated(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) | Value::Bool(_) => true,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

fn first_populated<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find(|v| is_populated(v))
}

fn first_text(record: &RawRecord, keys: &[&str]) -> Option<String> {
    first_populated(record, keys).map(|v| match v {
        Value::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    })
}

fn parse_coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn canonical_record_normalizes() {
        let r = record(json!({
            "car": "kea-1234",
            "x": "120.3014",
            "y": "22.6273",
            "location": "Zhongzheng Rd",
            "time": "2024-05-01 07:59:30",
        }));
        let t = normalize_record(&r, now()).unwrap();
        assert_eq!(t.id, "KEA-1234");
        assert_eq!(t.plate_number, "KEA-1234");
        assert_eq!(t.position, Position::new(22.6273, 120.3014));
        assert_eq!(t.location, "Zhongzheng Rd");
        assert_eq!(t.last_update, "2024-05-01 07:59:30");
        assert_eq!(t.status, DEFAULT_STATUS);
        assert_eq!(t.distance, None);
        assert!(!t.is_watched);
    }

    #[test]
    fn alternate_keys_and_defaults() {
        let r = record(json!({
            "plateNumber": " abc-9 ",
            "longitude": 120.5,
            "latitude": 22.5,
            "address": "Harbor",
            "status": "Collecting",
        }));
        let t = normalize_record(&r, now()).unwrap();
        assert_eq!(t.id, "ABC-9");
        assert_eq!(t.position, Position::new(22.5, 120.5));
        assert_eq!(t.location, "Harbor");
        assert_eq!(t.status, "Collecting");
        assert_eq!(t.last_update, "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn empty_higher_priority_field_falls_through() {
        let r = record(json!({ "car": "  ", "id": "z-1", "x": "", "lon": "120.1", "y": "22.1" }));
        let t = normalize_record(&r, now()).unwrap();
        assert_eq!(t.id, "Z-1");
        assert!((t.position.lng - 120.1).abs() < f64::EPSILON);
        assert_eq!(t.location, UNKNOWN_LOCATION);
    }

    #[test]
    fn missing_plate_or_bad_coordinates_reject() {
        for bad in [
            json!({ "x": "120.1", "y": "22.1" }),
            json!({ "car": "", "x": "120.1", "y": "22.1" }),
            json!({ "car": "A", "x": "abc", "y": "22.1" }),
            json!({ "car": "A", "x": "NaN", "y": "22.1" }),
            json!({ "car": "A", "x": "inf", "y": "22.1" }),
            json!({ "car": "A", "x": "120.1" }),
            json!({ "car": "A", "x": null, "y": "22.1" }),
        ] {
            assert!(normalize_record(&record(bad.clone()), now()).is_none(), "{bad}");
        }
    }

    #[test]
    fn batch_drops_exactly_the_invalid_records() {
        let records: Vec<RawRecord> = [
            json!({ "car": "A", "x": "120.1", "y": "22.1" }),
            json!({ "car": "B", "x": "oops", "y": "22.1" }),
            json!({ "car": "C", "x": "120.2", "y": "22.2" }),
            json!({ "x": "120.3", "y": "22.3" }),
            json!({ "car": "D", "x": 120.4, "y": 22.4 }),
        ]
        .into_iter()
        .map(record)
        .collect();

        let trucks = normalize_batch(&records, now());
        let ids: Vec<&str> = trucks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C", "D"]);
    }
}
