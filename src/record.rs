//! Schema-flexible records.
//!
//! A [`Record`] is one entity instance as the server sent it: a JSON object
//! whose fields may be missing or spelled under an alternate name. Accessors
//! here treat `null` and `""` as absent so alias chains fall through them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Candidate keys for the record identifier, in resolution order.
pub const ID_KEYS: &[&str] = &["id", "_id"];

/// One entity instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

/// Whether a value counts as present for alias resolution.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Render a scalar value as text. Collections and objects have no text form.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Raw field access, including `null` and empty values.
    pub fn raw(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value if present (non-null, non-empty string).
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| is_present(v))
    }

    /// First present value among `keys`.
    pub fn resolve(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Text form of a scalar field.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(value_text)
    }

    /// Numeric form of a field; numbers and numeric strings, otherwise 0.
    pub fn number(&self, field: &str) -> f64 {
        match self.get(field) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Length of a nested collection field, 0 when absent or not an array.
    pub fn count(&self, field: &str) -> usize {
        match self.get(field) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        }
    }

    /// Identifier under `id` or `_id`, as text.
    pub fn identifier(&self) -> Option<String> {
        self.resolve(ID_KEYS).and_then(value_text)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// New record with `fields` laid over this one. Fields not in `fields`
    /// keep their current values.
    pub fn merged(&self, fields: &Map<String, Value>) -> Record {
        let mut map = self.0.clone();
        for (key, value) in fields {
            map.insert(key.clone(), value.clone());
        }
        Record(map)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

#[cfg(test)]
pub(crate) fn record(value: Value) -> Record {
    Record::from_value(value).expect("test record must be an object")
}
