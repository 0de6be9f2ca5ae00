//! Canonical JSON encoding for world-state values
//!
//! Every value written to the world state goes through [`to_canonical_vec`]:
//! object keys sorted by byte order at every nesting level, compact output
//! with no insignificant whitespace. Replicas applying the same writes end up
//! with byte-identical stored values.

use crate::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Sort object keys recursively
///
/// Arrays keep their element order; only object keys are reordered.
pub fn sort_keys_recursive(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                sorted.insert(key, sort_keys_recursive(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys_recursive).collect()),
        other => other,
    }
}

/// Encode any serializable value canonically
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = sort_keys_recursive(serde_json::to_value(value)?);
    Ok(serde_json::to_vec(&value)?)
}

/// Encode canonically as a string
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = sort_keys_recursive(serde_json::to_value(value)?);
    Ok(serde_json::to_string(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_by_byte_order() {
        // Uppercase sorts before lowercase
        let value = json!({"docType": "device", "Status": "Active", "ID": "D1"});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"ID":"D1","Status":"Active","docType":"device"}"#
        );
    }

    #[test]
    fn test_nested_objects_sorted() {
        let value = json!({"b": [{"z": 1, "a": 2}], "a": {"y": null, "x": true}});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"a":{"x":true,"y":null},"b":[{"a":2,"z":1}]}"#
        );
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let mut first = Map::new();
        first.insert("Status".into(), json!("Active"));
        first.insert("ID".into(), json!("D7"));

        let mut second = Map::new();
        second.insert("ID".into(), json!("D7"));
        second.insert("Status".into(), json!("Active"));

        assert_eq!(
            to_canonical_vec(&Value::Object(first)).unwrap(),
            to_canonical_vec(&Value::Object(second)).unwrap()
        );
    }

    #[test]
    fn test_no_whitespace() {
        let encoded = to_canonical_string(&json!({"k": [1, 2, {"n": "v"}]})).unwrap();
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains('\n'));
    }
}
