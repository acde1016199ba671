use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A single entry of a resource. Insertion order of keys is preserved.
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const SLUG_FIELD: &str = "slug";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Epoch milliseconds, the unit of `createdAt` / `updatedAt`.
pub fn epoch_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    epoch_millis(Utc::now())
}

/// Returns the record's `id`, treating an explicit `null` as absent.
pub fn record_id(record: &Record) -> Option<&Value> {
    record.get(ID_FIELD).filter(|v| !v.is_null())
}

/// True when `record.id` or `record.slug` equals `key` exactly.
pub fn matches_id_or_slug(record: &Record, key: &Value) -> bool {
    record.get(ID_FIELD) == Some(key) || record.get(SLUG_FIELD) == Some(key)
}

/// JavaScript-style truthiness, used where a field counts as "set".
///
/// `null`, `false`, `0` and `""` are falsy; arrays and objects are always truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
