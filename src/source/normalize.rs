//! Availability record normalization
//!
//! Turns heterogeneous availability records into canonical string
//! identifiers. The policy is applied in order, first match wins:
//!
//! 1. String or numeric record - its string representation
//! 2. Object with a recognized date field - the date, optionally combined
//!    with slot times (`"<date>: <t1>, <t2>, ..."`)
//! 3. Anything else - a deterministic full serialization of the record
//!
//! Normalization is pure and deterministic: identical upstream payloads
//! always yield identical id sets, which is what makes repeated polls of an
//! unchanged window produce an empty "new" set.

use serde_json::{Map, Value};

use crate::models::{AvailabilityId, AvailabilityItem, Snapshot};

/// Date-bearing field aliases, probed in order
const DATE_ALIASES: &[&str] = &["Date", "date", "AvailableDate", "availableDate", "Day", "day"];

/// Slot-list field aliases, probed in order
const SLOT_LIST_ALIASES: &[&str] = &[
    "Slots",
    "slots",
    "Times",
    "times",
    "AvailableTimes",
    "availableTimes",
    "TimeSlots",
    "timeSlots",
];

/// Time field aliases on a slot record, probed in order
const SLOT_TIME_ALIASES: &[&str] = &["Time", "time", "TimeSlot", "timeSlot", "Start", "start"];

/// Normalize a batch of raw records into a snapshot.
///
/// Duplicates collapse and empty results are dropped.
pub fn normalize_all(items: &[AvailabilityItem]) -> Snapshot {
    items.iter().filter_map(normalize).collect()
}

/// Normalize one raw record into its canonical identifier.
///
/// Returns `None` for records that normalize to nothing (null, empty
/// strings), which are dropped from the snapshot.
pub fn normalize(item: &AvailabilityItem) -> Option<AvailabilityId> {
    match item {
        AvailabilityItem::Text(s) => non_empty(s.trim().to_string()),
        AvailabilityItem::Number(n) => Some(n.to_string()),
        AvailabilityItem::Record(map) => normalize_record(map),
        AvailabilityItem::Other(Value::Null) => None,
        AvailabilityItem::Other(value) => non_empty(stable_serialize(value)),
    }
}

fn normalize_record(map: &Map<String, Value>) -> Option<AvailabilityId> {
    if let Some(date) = probe_scalar(map, DATE_ALIASES) {
        let times = probe_slot_times(map);
        if times.is_empty() {
            return Some(date);
        }
        return Some(format!("{}: {}", date, times.join(", ")));
    }

    // Last resort: deterministic serialization of the whole record.
    // serde_json's object map is ordered by key, so the output is stable
    // regardless of upstream field order.
    non_empty(stable_serialize(&Value::Object(map.clone())))
}

/// Find the first alias whose value is a non-empty scalar
fn probe_scalar(map: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| map.get(*alias).and_then(scalar_to_string))
}

/// Collect slot times from the first recognized slot list, in list order
fn probe_slot_times(map: &Map<String, Value>) -> Vec<String> {
    let slots = SLOT_LIST_ALIASES
        .iter()
        .find_map(|alias| map.get(*alias).and_then(Value::as_array));

    let Some(slots) = slots else {
        return Vec::new();
    };

    slots
        .iter()
        .filter_map(|slot| match slot {
            Value::Object(fields) => probe_scalar(fields, SLOT_TIME_ALIASES),
            other => scalar_to_string(other),
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn stable_serialize(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
