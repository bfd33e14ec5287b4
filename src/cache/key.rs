//! Cache key derivation
//!
//! Keys are a SHA-256 digest over `(agent, query_type, params)` with every
//! object's keys sorted, so `{a:1,b:2}` and `{b:2,a:1}` land in the same slot.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::core::{QueryParams, QueryType};

/// Rebuild a JSON value with object keys in sorted order, recursively
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Derive the cache key for a query
pub fn cache_key(agent_name: &str, query_type: QueryType, params: &QueryParams) -> String {
    let params = canonicalize(&Value::Object(params.clone()));

    let mut hasher = Sha256::new();
    hasher.update(agent_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(query_type.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(params.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> QueryParams {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_key_order_independent() {
        let mut forward = QueryParams::new();
        forward.insert("a".into(), json!(1));
        forward.insert("b".into(), json!(2));

        let mut backward = QueryParams::new();
        backward.insert("b".into(), json!(2));
        backward.insert("a".into(), json!(1));

        assert_eq!(
            cache_key("Watson", QueryType::CardInquiry, &forward),
            cache_key("Watson", QueryType::CardInquiry, &backward)
        );
    }

    #[test]
    fn test_nested_objects_are_canonicalized() {
        let canonical = canonicalize(&json!({"z": {"y": 1, "x": [{"b": 1, "a": 2}]}, "a": 0}));
        assert_eq!(
            canonical.to_string(),
            r#"{"a":0,"z":{"x":[{"a":2,"b":1}],"y":1}}"#
        );
    }

    #[test]
    fn test_key_distinguishes_agent_type_and_params() {
        let p = params(json!({"card": "Rope"}));
        let base = cache_key("Watson", QueryType::CardInquiry, &p);

        assert_ne!(base, cache_key("Holmes", QueryType::CardInquiry, &p));
        assert_ne!(base, cache_key("Watson", QueryType::RevelationRequest, &p));
        assert_ne!(
            base,
            cache_key("Watson", QueryType::CardInquiry, &params(json!({"card": "Knife"})))
        );
        assert_eq!(base.len(), 64);
    }
}
