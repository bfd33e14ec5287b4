//! Field redaction
//!
//! Strips forbidden keys from result payloads before they are cached or
//! returned.

use serde_json::Value;

/// Remove every object key named in `forbidden`, at any depth
///
/// Objects and arrays are walked recursively. Scalars pass through
/// unchanged.
pub fn redact_fields(value: &mut Value, forbidden: &[String]) {
    if forbidden.is_empty() {
        return;
    }

    match value {
        Value::Object(map) => {
            map.retain(|key, _| !forbidden.iter().any(|f| f == key));
            for child in map.values_mut() {
                redact_fields(child, forbidden);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_fields(item, forbidden);
            }
        }
        _ => {}
    }
}

/// Redacted copy of `value`
pub fn redacted(value: &Value, forbidden: &[String]) -> Value {
    let mut copy = value.clone();
    redact_fields(&mut copy, forbidden);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forbidden(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_strips_nested_keys() {
        let data = json!({
            "card": "Knife",
            "holder": "Moriarty",
            "details": {"holder": "Moriarty", "level": 2},
            "history": [{"holder": "Moriarty", "card": "Library"}, 3, "text"],
        });

        let out = redacted(&data, &forbidden(&["holder"]));
        assert_eq!(
            out,
            json!({
                "card": "Knife",
                "details": {"level": 2},
                "history": [{"card": "Library"}, 3, "text"],
            })
        );
    }

    #[test]
    fn test_no_forbidden_fields_leaves_data_unchanged() {
        let data = json!({"card": "Knife", "held": true, "nested": [{"a": 1}]});
        assert_eq!(redacted(&data, &forbidden(&["solution"])), data);
        assert_eq!(redacted(&data, &[]), data);
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let data = json!({"a": {"secret": 1, "b": [{"secret": 2, "c": 3}]}, "secret": 4});
        let keys = forbidden(&["secret"]);

        let once = redacted(&data, &keys);
        let twice = redacted(&once, &keys);
        assert_eq!(once, twice);
        assert_eq!(once, json!({"a": {"b": [{"c": 3}]}}));
    }

    #[test]
    fn test_scalars_pass_through() {
        let keys = forbidden(&["x"]);
        assert_eq!(redacted(&json!("x"), &keys), json!("x"));
        assert_eq!(redacted(&Value::Null, &keys), Value::Null);
    }
}
