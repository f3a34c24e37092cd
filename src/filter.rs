//! Filter engine.
//!
//! Filtering is an exact, case-sensitive match on the stored value of the
//! facet field. It runs on the already sorted collection, so the result is
//! in sort order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// Selected filter value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    /// Passthrough
    #[default]
    All,
    /// Keep records whose facet field equals this value
    Only(Value),
}

impl FilterValue {
    /// Shorthand for a text facet value.
    pub fn only(value: impl Into<Value>) -> Self {
        FilterValue::Only(value.into())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FilterValue::All)
    }

    pub fn matches(&self, record: &Record, field: &str) -> bool {
        match self {
            FilterValue::All => true,
            FilterValue::Only(selected) => record.raw(field) == Some(selected),
        }
    }
}

/// The active filter of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub key: String,
    pub value: FilterValue,
}

/// Subsequence of `records` matching `value` on `field`.
pub fn apply_filter(records: &[Record], field: &str, value: &FilterValue) -> Vec<Record> {
    match value {
        FilterValue::All => records.to_vec(),
        FilterValue::Only(_) => records
            .iter()
            .filter(|r| value.matches(r, field))
            .cloned()
            .collect(),
    }
}
