//! # Canonical JSON
//!
//! Every digest over structured data (salted leaves above all) is taken
//! over [`CanonicalBytes`]. The wrapper can only be built by
//! serializing through `serde_jcs` (RFC 8785): keys sorted, no whitespace,
//! ECMAScript number rendering. Two equal JSON values give equal bytes no
//! matter how their maps were built.
//!
//! Floats are fine here. Payloads are user data, and JCS renders every
//! finite double one way.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// UTF-8 JSON in JCS form. Keys are ordered by UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Serialize `obj` and canonicalize it.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON (e.g. a map with non-string keys).
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_str(value: &serde_json::Value) -> String {
        let cb = CanonicalBytes::new(value).expect("should canonicalize");
        String::from_utf8(cb.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_canonical_bytes_sorted_keys() {
        let data = serde_json::json!({"z": 1, "m": 2, "a": 3});
        assert_eq!(canonical_str(&data), r#"{"a":3,"m":2,"z":1}"#);
    }

    #[test]
    fn test_canonical_bytes_nested() {
        let data = serde_json::json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        // Nested objects are sorted, arrays keep their order.
        assert_eq!(canonical_str(&data), r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn test_salted_leaf_shape() {
        let data = serde_json::json!({"name": {"value": "Alice", "salt": "ab"}});
        assert_eq!(canonical_str(&data), r#"{"name":{"salt":"ab","value":"Alice"}}"#);
    }

    #[test]
    fn test_float_accepted() {
        let data = serde_json::json!({"price": 1.5, "whole": 2.0});
        assert_eq!(canonical_str(&data), r#"{"price":1.5,"whole":2}"#);
    }

    #[test]
    fn test_null_and_bool_passthrough() {
        let data = serde_json::json!({"flag": true, "other": false, "key": null});
        assert_eq!(canonical_str(&data), r#"{"flag":true,"key":null,"other":false}"#);
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(canonical_str(&serde_json::json!({})), "{}");
        assert_eq!(canonical_str(&serde_json::json!([])), "[]");
    }

    #[test]
    fn test_string_value() {
        let cb = CanonicalBytes::new(&"hello world").expect("string should work");
        assert_eq!(cb.as_bytes(), b"\"hello world\"");
        assert!(!cb.is_empty());
        assert_eq!(cb.len(), 13);
    }

    #[test]
    fn test_unicode_passthrough() {
        let data = serde_json::json!({"name": "\u{00e9}\u{00e8}"});
        assert!(canonical_str(&data).contains('\u{00e9}'));
    }
}
