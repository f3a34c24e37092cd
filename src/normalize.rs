//! Collection normalizer.
//!
//! The data service may answer with a bare array or with a paginated
//! envelope `{ "count": .., "next": .., "results": [...] }`. Both become a
//! plain `Vec<Record>` in server order. Anything else normalizes to an
//! empty collection; a malformed shape is not an error.

use serde_json::Value;
use tracing::debug;

use crate::record::Record;

/// Alternate spellings of one field. The first present fallback is copied
/// into `canonical` when the canonical field itself is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    pub canonical: &'static str,
    pub fallbacks: &'static [&'static str],
}

impl FieldAlias {
    pub const fn new(canonical: &'static str, fallbacks: &'static [&'static str]) -> Self {
        Self {
            canonical,
            fallbacks,
        }
    }
}

/// Unwrap an envelope if there is one and coerce to records.
///
/// Array entries that are not JSON objects are dropped.
pub fn normalize(raw: Value) -> Vec<Record> {
    let items = match raw {
        Value::Object(mut map) if map.contains_key("results") => map.remove("results"),
        other => Some(other),
    };

    match items {
        Some(Value::Array(items)) => {
            let total = items.len();
            let records: Vec<Record> = items.into_iter().filter_map(Record::from_value).collect();
            if records.len() != total {
                debug!(
                    dropped = total - records.len(),
                    "Dropped non-object entries from collection"
                );
            }
            records
        }
        _ => {
            debug!("Response is not a collection, treating as empty");
            Vec::new()
        }
    }
}

/// Fill canonical fields from their aliases. Alias fields are kept as-is.
pub fn canonicalize(record: &Record, aliases: &[FieldAlias]) -> Record {
    let mut out = record.clone();
    for alias in aliases {
        if out.contains(alias.canonical) {
            continue;
        }
        if let Some(value) = record.resolve(alias.fallbacks) {
            out.insert(alias.canonical, value.clone());
        }
    }
    out
}

/// [`normalize`] followed by [`canonicalize`] on every record.
pub fn normalize_with(raw: Value, aliases: &[FieldAlias]) -> Vec<Record> {
    normalize(raw)
        .iter()
        .map(|record| canonicalize(record, aliases))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;
    use serde_json::json;

    #[test]
    fn test_envelope_equals_bare_array() {
        let a = json!({"id": 1, "name": "a"});
        let b = json!({"id": 2, "name": "b"});

        let from_envelope = normalize(json!({"count": 2, "next": null, "results": [a, b]}));
        let from_array = normalize(json!([a, b]));

        assert_eq!(from_envelope, from_array);
        assert_eq!(from_array.len(), 2);
        assert_eq!(from_array[0].identifier().as_deref(), Some("1"));
    }

    #[test]
    fn test_non_collections_are_empty() {
        assert!(normalize(json!("not a collection")).is_empty());
        assert!(normalize(json!(42)).is_empty());
        assert!(normalize(json!(null)).is_empty());
        assert!(normalize(json!({"name": "single object"})).is_empty());
        assert!(normalize(json!({"results": null})).is_empty());
        assert!(normalize(json!({"results": {"id": 1}})).is_empty());
    }

    #[test]
    fn test_drops_non_object_entries() {
        let records = normalize(json!([{"id": 1}, "junk", 3, {"id": 2}]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].identifier().as_deref(), Some("2"));
    }

    #[test]
    fn test_preserves_server_order() {
        let records = normalize(json!([{"name": "z"}, {"name": "a"}, {"name": "m"}]));
        let names: Vec<_> = records.iter().filter_map(|r| r.text("name")).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_canonicalize_fills_from_first_fallback() {
        const ALIASES: &[FieldAlias] = &[
            FieldAlias::new("id", &["_id"]),
            FieldAlias::new("total_calories", &["total_points"]),
        ];

        let out = canonicalize(&record(json!({"_id": "abc", "total_points": 40})), ALIASES);
        assert_eq!(out.raw("id"), Some(&json!("abc")));
        assert_eq!(out.raw("total_calories"), Some(&json!(40)));
        assert_eq!(out.raw("total_points"), Some(&json!(40)));
        assert_eq!(out.raw("_id"), Some(&json!("abc")));

        let out = canonicalize(&record(json!({"total_calories": 90, "total_points": 40})), ALIASES);
        assert_eq!(out.raw("total_calories"), Some(&json!(90)));
        assert!(out.raw("id").is_none());
    }

    #[test]
    fn test_canonicalize_replaces_empty_canonical() {
        const ALIASES: &[FieldAlias] = &[FieldAlias::new("user_name", &["user"])];

        let out = canonicalize(&record(json!({"user_name": "", "user": "sam"})), ALIASES);
        assert_eq!(out.text("user_name").as_deref(), Some("sam"));
    }
}
