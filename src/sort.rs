//! Comparator engine and sort specification.
//!
//! Every comparison is a total order over records for one field. Direction
//! reverses the base ordering, and sorting is done with the stable
//! `slice::sort_by`, so records that compare equal keep their relative
//! order in both directions.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use feruca::Collator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{value_text, Record};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Orient a base (ascending) ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// How a field's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Case-insensitive text
    Text,
    /// Numeric, missing as 0
    Number,
    /// Parsed instant, unparsable as the oldest instant
    Date,
    /// Length of a nested collection, missing as 0
    Count,
}

/// The active sort of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    /// Next specification after activating `key`: the same key flips
    /// direction, a different key starts at `default_direction`.
    pub fn next(current: Option<&SortSpec>, key: &str, default_direction: SortDirection) -> Self {
        match current {
            Some(spec) if spec.key == key => Self::new(key, spec.direction.toggled()),
            _ => Self::new(key, default_direction),
        }
    }

    /// Header indicator for `key`, empty unless it is the active column.
    pub fn indicator(&self, key: &str) -> &'static str {
        if self.key == key {
            self.direction.indicator()
        } else {
            ""
        }
    }
}

/// Parse a date-like value into an instant.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DD[T| ]HH:MM:SS[.f]` (taken
/// as UTC), bare `YYYY-MM-DD` dates (midnight UTC) and epoch milliseconds.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    let text = match value {
        Value::String(s) => s.trim(),
        Value::Number(n) => return n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => return None,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn text_key(record: &Record, field: &str) -> String {
    record
        .get(field)
        .and_then(value_text)
        .unwrap_or_default()
        .to_lowercase()
}

fn date_key(record: &Record, field: &str) -> DateTime<Utc> {
    record
        .get(field)
        .and_then(parse_instant)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Ascending comparison of two records on `field`.
///
/// Text is lowercased and then collated with the Unicode Collation
/// Algorithm (root locale), so accented letters sort beside their base
/// letters instead of after `z`.
pub fn compare_records(a: &Record, b: &Record, field: &str, kind: FieldKind) -> Ordering {
    compare_with(&mut Collator::default(), a, b, field, kind)
}

fn compare_with(
    collator: &mut Collator,
    a: &Record,
    b: &Record,
    field: &str,
    kind: FieldKind,
) -> Ordering {
    match kind {
        FieldKind::Text => {
            let (a, b) = (text_key(a, field), text_key(b, field));
            collator.collate(a.as_str(), b.as_str())
        }
        FieldKind::Number => a.number(field).total_cmp(&b.number(field)),
        FieldKind::Date => date_key(a, field).cmp(&date_key(b, field)),
        FieldKind::Count => a.count(field).cmp(&b.count(field)),
    }
}

/// Stable sort into a new sequence; the input is left untouched.
pub fn sort_records(
    records: &[Record],
    field: &str,
    kind: FieldKind,
    direction: SortDirection,
) -> Vec<Record> {
    let mut collator = Collator::default();
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| direction.apply(compare_with(&mut collator, a, b, field, kind)));
    sorted
}
