// Feed envelope unwrapping
//
// The upstream feed has shipped several payload shapes over time. This
// module locates the record array inside whatever envelope arrives and
// hands back the records as open JSON maps.

use serde_json::{Map, Value};
use tracing::{trace, warn};

/// One loosely-typed telemetry record, exactly as the feed sent it.
pub type RawRecord = Map<String, Value>;

/// Envelope fields checked, in order, before falling back to a search.
const KNOWN_ARRAY_FIELDS: [&str; 4] = ["data", "result", "records", "items"];

/// Locate the record array in a decoded feed payload.
///
/// Accepts a top-level array, an object with one of the known array
/// fields, or failing both, the first array found anywhere inside the
/// object (shallow fields before nested ones). Returns an empty list when
/// no array exists. Array elements that are not JSON objects are dropped.
pub fn unwrap_records(payload: Value) -> Vec<RawRecord> {
    let array = match payload {
        Value::Array(items) => items,
        Value::Object(mut obj) => match take_known_array(&mut obj).or_else(|| find_array(obj)) {
            Some(items) => items,
            None => {
                warn!("unexpected feed payload shape: no record array found");
                return Vec::new();
            }
        },
        other => {
            warn!(kind = value_kind(&other), "unexpected feed payload shape");
            return Vec::new();
        }
    };

    let total = array.len();
    let records: Vec<RawRecord> = array
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if records.len() < total {
        trace!(
            dropped = total - records.len(),
            "skipped non-object entries in feed array"
        );
    }
    records
}

fn take_known_array(obj: &mut Map<String, Value>) -> Option<Vec<Value>> {
    for field in KNOWN_ARRAY_FIELDS {
        if matches!(obj.get(field), Some(Value::Array(_))) {
            if let Some(Value::Array(items)) = obj.remove(field) {
                return Some(items);
            }
        }
    }
    None
}

/// Breadth-first: every direct field of an object is checked before any
/// nested object is entered.
fn find_array(obj: Map<String, Value>) -> Option<Vec<Value>> {
    let mut nested = Vec::new();
    for (_, value) in obj {
        match value {
            Value::Array(items) => return Some(items),
            Value::Object(inner) => nested.push(inner),
            _ => {}
        }
    }
    nested.into_iter().find_map(find_array)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
