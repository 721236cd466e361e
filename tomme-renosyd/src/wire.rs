//! Lenient mapping of the RenoSyd `toemmekalender` payload onto core models.
//!
//! Upstream records are parsed field by field so one malformed value never
//! discards a whole schedule. Missing or mistyped fields fall back to:
//!
//! | wire type | fallback |
//! |---|---|
//! | string | `""` (numbers are accepted and rendered as text) |
//! | optional string | `None` |
//! | integer | `0` |
//! | float | `0.0` |
//! | list of names | empty, non-string entries skipped |
//! | nested object | record of fallbacks |
//! | timestamp | current time |

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde_json::Value;
use tomme_core::{
    model::{Address, CollectionPoint, CollectionPointId, PlannedCollection, Schedule},
    ports::PortError,
};
use tracing::warn;

static MISSING: Value = Value::Null;

/// Parse the top-level response, which must be a JSON array.
pub(crate) fn parse_schedules(body: &Value) -> Result<Vec<Schedule>, PortError> {
    let Some(items) = body.as_array() else {
        return Err(PortError::SchemaMismatch(format!(
            "expected a list of schedules, got {}",
            kind(body)
        )));
    };

    Ok(items.iter().map(parse_schedule).collect())
}

fn parse_schedule(value: &Value) -> Schedule {
    let collections = value
        .get("planlagtetømninger")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(parse_planned_collection).collect())
        .unwrap_or_default();

    Schedule {
        collection_point: parse_collection_point(nested(value, "standplads")),
        collections,
    }
}

fn parse_collection_point(value: &Value) -> CollectionPoint {
    let last_modified = value
        .get("sidstændret")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or_else(|| Local::now().fixed_offset());

    CollectionPoint {
        id: CollectionPointId(text(value, "nummer")),
        name: text(value, "navn"),
        description: optional_text(value, "beskrivelse"),
        address: parse_address(nested(value, "adresse")),
        longitude: float(value, "længdegrad"),
        latitude: float(value, "breddegrad"),
        last_modified,
        container: optional_text(value, "beholder"),
    }
}

fn parse_address(value: &Value) -> Address {
    Address {
        name: text(value, "navn"),
        street: text(value, "vejnavn"),
        house_number: text(value, "husnummer"),
        floor: optional_text(value, "etage"),
        door: optional_text(value, "sidedør"),
        postal_district: text(value, "postdistrikt"),
        postal_code: text(value, "postnummer"),
        kvhx_code: text(value, "kvhxcode"),
        municipality_code: integer(value, "kommunenummer"),
        road_code: integer(value, "vejkode"),
        latitude: float(value, "breddegrad"),
        longitude: float(value, "laengdegrad"),
    }
}

fn parse_planned_collection(value: &Value) -> PlannedCollection {
    let fractions = names(value, "fraktioner");
    let raw_date = value.get("dato").and_then(Value::as_str);

    match raw_date.and_then(parse_timestamp) {
        Some(date) => PlannedCollection::new(date, fractions),
        None => {
            warn!(dato = ?raw_date, "Unreadable collection date, substituting now");
            PlannedCollection::with_fallback_date(fractions)
        }
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (`Z` or numeric offset), a naive date-time read as local
/// time, or a bare date taken as local midnight.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return local(naive);
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return local(day.and_time(NaiveTime::MIN));
    }
    None
}

fn local(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|date| date.fixed_offset())
}

fn nested<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).unwrap_or(&MISSING)
}

fn text(value: &Value, key: &str) -> String {
    optional_text(value, key).unwrap_or_default()
}

fn optional_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}

fn integer(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn float(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn names(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
