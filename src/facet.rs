//! Facet extraction for filter controls.

use serde_json::Value;

use crate::record::{value_text, Record};

/// Distinct present values of `field`, in first-seen order.
pub fn extract_facets(records: &[Record], field: &str) -> Vec<Value> {
    let mut facets: Vec<Value> = Vec::new();
    for value in records.iter().filter_map(|r| r.get(field)) {
        if !facets.contains(value) {
            facets.push(value.clone());
        }
    }
    facets
}

/// Option labels for a facet set. Values with no text form are skipped.
pub fn facet_labels(facets: &[Value]) -> Vec<String> {
    facets.iter().filter_map(value_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;
    use serde_json::json;

    #[test]
    fn test_distinct_first_seen() {
        let records = vec![
            record(json!({"team": "Red"})),
            record(json!({"team": "Blue"})),
            record(json!({"team": "Red"})),
            record(json!({"team": "Green"})),
            record(json!({"team": "Blue"})),
        ];
        assert_eq!(
            extract_facets(&records, "team"),
            vec![json!("Red"), json!("Blue"), json!("Green")]
        );
    }

    #[test]
    fn test_skips_absent_and_empty() {
        let records = vec![
            record(json!({"team": ""})),
            record(json!({"name": "no team"})),
            record(json!({"team": null})),
            record(json!({"team": "Red"})),
        ];
        assert_eq!(extract_facets(&records, "team"), vec![json!("Red")]);
        assert!(extract_facets(&[], "team").is_empty());
    }

    #[test]
    fn test_case_distinct_values_kept() {
        let records = vec![record(json!({"team": "red"})), record(json!({"team": "Red"}))];
        assert_eq!(extract_facets(&records, "team").len(), 2);
    }

    #[test]
    fn test_labels() {
        let facets = vec![json!("Run"), json!(3), json!(["x"])];
        assert_eq!(facet_labels(&facets), vec!["Run", "3"]);
    }
}
