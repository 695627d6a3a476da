//! # Salter
//!
//! Attaches a unique random salt to every scalar leaf of a document so that
//! the digest of a leaf reveals nothing about its value without the salt.
//!
//! Two layouts are produced:
//!
//! - **Embedded** ([`Salter::salt_data`]): every scalar leaf is replaced in
//!   place by `{"salt": "<64 hex>", "value": <leaf>}`. The tree keeps its
//!   shape, so [`unsalt_data`] restores the original exactly.
//! - **Path list** ([`Salter::salt_paths`]): the document is left untouched
//!   and a `[{path, salt}]` list is returned instead.
//!
//! ## Redaction placeholders
//!
//! A bare `null` element inside an array of a salted payload is what remains
//! after that element was redacted (removing it would shift the paths of its
//! siblings). It is skipped by [`salted_leaves`] and kept as `null` by
//! [`unsalt_data`]. A bare scalar anywhere else is an error.
//!
//! ## Security Invariant
//!
//! Salts are 32 bytes from `OsRng`. Salting the same document twice yields
//! different salts and therefore different digests, which keeps two
//! wrappings of identical content unlinkable.

use std::collections::HashSet;

use oa_core::FieldPath;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of random bytes in a salt.
pub const SALT_BYTES: usize = 32;

/// Error reading or parsing salted data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaltError {
    /// A scalar leaf was found where a salted value was expected.
    #[error("unsalted leaf at '{path}'")]
    UnsaltedLeaf {
        /// Rendered path of the leaf.
        path: String,
    },

    /// A salt was not 64 lowercase hex characters.
    #[error("malformed salt at '{path}': {reason}")]
    MalformedSalt {
        /// Rendered path of the leaf (or salt list entry).
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// A random salt, rendered as 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Salt(String);

impl Salt {
    /// Draw a fresh salt from the operating system CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Parse an existing salt.
    ///
    /// # Errors
    ///
    /// Returns `SaltError::MalformedSalt` unless the input is exactly 64
    /// lowercase hex chars. The `path` in the error is left empty; callers
    /// that know where the salt came from fill it in.
    pub fn parse(s: &str) -> Result<Self, SaltError> {
        let malformed = |reason: &str| SaltError::MalformedSalt {
            path: String::new(),
            reason: reason.to_string(),
        };
        if s.len() != SALT_BYTES * 2 {
            return Err(malformed("expected 64 hex chars"));
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(malformed("expected lowercase hex"));
        }
        Ok(Self(s.to_string()))
    }

    /// The hex rendering.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Salt {
    type Error = SaltError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Salt> for String {
    fn from(salt: Salt) -> Self {
        salt.0
    }
}

impl std::fmt::Display for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A leaf (a scalar or an empty object or array) paired with its salt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaltedValue {
    /// The leaf's salt.
    pub salt: Salt,
    /// The original leaf value.
    pub value: Value,
}

impl SaltedValue {
    /// Pair a value with a salt.
    pub fn new(salt: Salt, value: Value) -> Self {
        Self { salt, value }
    }

    /// Recognize the embedded `{"salt", "value"}` form.
    ///
    /// Returns `Ok(None)` for any node that is not a salted leaf, including
    /// user objects whose keys happen to be `salt` and `value` (after
    /// salting, such an object's `salt` member is itself an object).
    fn from_node(node: &Value, path: &FieldPath) -> Result<Option<Self>, SaltError> {
        let Some(map) = node.as_object() else {
            return Ok(None);
        };
        if map.len() != 2 {
            return Ok(None);
        }
        let (Some(Value::String(salt)), Some(value)) = (map.get("salt"), map.get("value")) else {
            return Ok(None);
        };
        if !is_leaf(value) {
            return Ok(None);
        }
        let salt = Salt::parse(salt).map_err(|e| with_path(e, path))?;
        Ok(Some(Self::new(salt, value.clone())))
    }

    fn to_node(&self) -> Value {
        let mut map = Map::new();
        map.insert("salt".to_string(), Value::String(self.salt.0.clone()));
        map.insert("value".to_string(), self.value.clone());
        Value::Object(map)
    }
}

/// Returns true for nodes that are committed to as a single leaf: scalars
/// and empty objects or arrays.
pub fn is_leaf(node: &Value) -> bool {
    match node {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => true,
    }
}

/// One entry of a path-list salt layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSalt {
    /// Rendered field path of the leaf.
    pub path: String,
    /// The leaf's salt.
    pub salt: Salt,
}

fn with_path(err: SaltError, path: &FieldPath) -> SaltError {
    match err {
        SaltError::MalformedSalt { reason, .. } => SaltError::MalformedSalt {
            path: path.to_string(),
            reason,
        },
        other => other,
    }
}

/// Issues salts for one document, never repeating a salt within it.
#[derive(Debug, Default)]
pub struct Salter {
    issued: HashSet<Salt>,
}

impl Salter {
    /// A salter with no salts issued yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a salt not yet issued by this salter.
    pub fn next_salt(&mut self) -> Salt {
        loop {
            let salt = Salt::generate();
            if self.issued.insert(salt.clone()) {
                return salt;
            }
        }
    }

    /// Number of salts issued so far.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Replace every leaf with an embedded salted value.
    pub fn salt_data(&mut self, data: &Value) -> Value {
        match data {
            Value::Object(map) if !map.is_empty() => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.salt_data(v)))
                    .collect(),
            ),
            Value::Array(items) if !items.is_empty() => {
                Value::Array(items.iter().map(|v| self.salt_data(v)).collect())
            }
            leaf => SaltedValue::new(self.next_salt(), leaf.clone()).to_node(),
        }
    }

    /// Produce one salt per leaf path, leaving the document as is.
    pub fn salt_paths(&mut self, document: &Value) -> Vec<PathSalt> {
        let mut out = Vec::new();
        self.collect_paths(document, &FieldPath::root(), &mut out);
        out
    }

    fn collect_paths(&mut self, node: &Value, path: &FieldPath, out: &mut Vec<PathSalt>) {
        match node {
            Value::Object(map) if !map.is_empty() => {
                for (k, v) in map {
                    self.collect_paths(v, &path.key(k), out);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (i, v) in items.iter().enumerate() {
                    self.collect_paths(v, &path.index(i), out);
                }
            }
            _ => out.push(PathSalt {
                path: path.to_string(),
                salt: self.next_salt(),
            }),
        }
    }
}

/// Salt a payload with a fresh [`Salter`].
pub fn salt_data(data: &Value) -> Value {
    Salter::new().salt_data(data)
}

/// Strip salts from an embedded salted payload, restoring the original shape.
///
/// # Errors
///
/// Returns `SaltError::UnsaltedLeaf` for a bare scalar other than a `null`
/// array element and
/// `SaltError::MalformedSalt` for a salted leaf whose salt is not 64 hex chars.
pub fn unsalt_data(data: &Value) -> Result<Value, SaltError> {
    unsalt_node(data, &FieldPath::root(), false)
}

fn unsalt_node(node: &Value, path: &FieldPath, in_array: bool) -> Result<Value, SaltError> {
    if let Some(salted) = SaltedValue::from_node(node, path)? {
        return Ok(salted.value);
    }
    match node {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), unsalt_node(v, &path.key(k), false)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| unsalt_node(v, &path.index(i), true))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Null if in_array => Ok(Value::Null),
        _ => Err(SaltError::UnsaltedLeaf {
            path: path.to_string(),
        }),
    }
}

/// Enumerate the salted leaves of an embedded salted payload, in tree order.
///
/// # Errors
///
/// Same as [`unsalt_data`].
pub fn salted_leaves(data: &Value) -> Result<Vec<(FieldPath, SaltedValue)>, SaltError> {
    let mut out = Vec::new();
    collect_leaves(data, &FieldPath::root(), false, &mut out, &mut 0)?;
    Ok(out)
}

/// Count the unsalted gaps redaction leaves behind in an embedded salted
/// payload: bare `null` array elements and bare empty objects or arrays.
///
/// Each gap stands for at least one redacted leaf, so a payload with more
/// gaps than obfuscated digests has been tampered with.
///
/// # Errors
///
/// Same as [`unsalt_data`].
pub fn redaction_gaps(data: &Value) -> Result<usize, SaltError> {
    let mut gaps = 0;
    collect_leaves(data, &FieldPath::root(), false, &mut Vec::new(), &mut gaps)?;
    Ok(gaps)
}

fn collect_leaves(
    node: &Value,
    path: &FieldPath,
    in_array: bool,
    out: &mut Vec<(FieldPath, SaltedValue)>,
    gaps: &mut usize,
) -> Result<(), SaltError> {
    if let Some(salted) = SaltedValue::from_node(node, path)? {
        out.push((path.clone(), salted));
        return Ok(());
    }
    let gap = match node {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Null => in_array,
        _ => false,
    };
    if gap {
        *gaps += 1;
        return Ok(());
    }
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                collect_leaves(v, &path.key(k), false, out, gaps)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                collect_leaves(v, &path.index(i), true, out, gaps)?;
            }
            Ok(())
        }
        _ => Err(SaltError::UnsaltedLeaf {
            path: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "name": "Alice",
            "age": 30,
            "active": true,
            "nickname": null,
            "tags": ["a", "b"],
            "address": {"city": "Singapore", "lines": []},
            "meta": {}
        })
    }

    #[test]
    fn test_salt_generate_format() {
        let s = Salt::generate();
        assert_eq!(s.as_str().len(), 64);
        assert!(Salt::parse(s.as_str()).is_ok());
    }

    #[test]
    fn test_salt_parse_rejects_bad_input() {
        assert!(Salt::parse("abc").is_err());
        assert!(Salt::parse(&"G".repeat(64)).is_err());
        assert!(Salt::parse(&"A".repeat(64)).is_err());
    }

    #[test]
    fn test_salt_data_shape() {
        let salted = salt_data(&sample());
        assert!(salted["name"]["salt"].is_string());
        assert_eq!(salted["name"]["value"], "Alice");
        assert_eq!(salted["age"]["value"], 30);
        assert_eq!(salted["nickname"]["value"], Value::Null);
        assert_eq!(salted["tags"][1]["value"], "b");
        assert_eq!(salted["address"]["lines"]["value"], json!([]));
        assert_eq!(salted["meta"]["value"], json!({}));
        assert!(salted["address"]["lines"]["salt"].is_string());
    }

    #[test]
    fn test_unsalt_round_trip() {
        let original = sample();
        assert_eq!(unsalt_data(&salt_data(&original)).unwrap(), original);
    }

    #[test]
    fn test_user_object_named_like_salted_value() {
        let original = json!({"x": {"salt": "not-a-salt", "value": 5}});
        let salted = salt_data(&original);
        assert!(salted["x"]["salt"].is_object());
        assert_eq!(unsalt_data(&salted).unwrap(), original);
    }

    #[test]
    fn test_salts_unique_within_document() {
        let mut salter = Salter::new();
        let salted = salter.salt_data(&sample());
        let leaves = salted_leaves(&salted).unwrap();
        let distinct: HashSet<_> = leaves.iter().map(|(_, sv)| sv.salt.clone()).collect();
        assert_eq!(distinct.len(), leaves.len());
        assert_eq!(salter.issued(), leaves.len());
    }

    #[test]
    fn test_resalting_yields_different_salts() {
        let a = salted_leaves(&salt_data(&sample())).unwrap();
        let b = salted_leaves(&salt_data(&sample())).unwrap();
        assert_eq!(a.len(), b.len());
        for ((pa, sa), (pb, sb)) in a.iter().zip(b.iter()) {
            assert_eq!(pa, pb);
            assert_ne!(sa.salt, sb.salt);
        }
    }

    #[test]
    fn test_salted_leaves_paths() {
        let salted = salt_data(&json!({"tags": ["a"], "n": {"m": 1}}));
        let mut paths: Vec<String> = salted_leaves(&salted)
            .unwrap()
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["n.m".to_string(), "tags[0]".to_string()]);
    }

    #[test]
    fn test_placeholder_in_array_is_skipped() {
        let mut salted = salt_data(&json!({"tags": ["a", "b"]}));
        salted["tags"][0] = Value::Null;
        let leaves = salted_leaves(&salted).unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].0.to_string(), "tags[1]");
        assert_eq!(unsalt_data(&salted).unwrap(), json!({"tags": [null, "b"]}));
    }

    #[test]
    fn test_empty_containers_are_leaves() {
        let salted = salt_data(&json!({"roles": [], "extra": {}, "n": 1}));
        let leaves = salted_leaves(&salted).unwrap();
        assert_eq!(leaves.len(), 3);
        let extra = leaves.iter().find(|(p, _)| p.to_string() == "extra").unwrap();
        assert_eq!(extra.1.value, json!({}));
        assert_eq!(redaction_gaps(&salted).unwrap(), 0);
    }

    #[test]
    fn test_redaction_gaps_counts_bare_placeholders() {
        let mut salted = salt_data(&json!({"tags": ["a", "b"], "addr": {"city": "x"}}));
        salted["tags"][1] = Value::Null;
        salted["addr"].as_object_mut().unwrap().remove("city");
        assert_eq!(redaction_gaps(&salted).unwrap(), 2);

        salted["tags"].as_array_mut().unwrap().push(Value::Null);
        salted["more"] = json!([]);
        assert_eq!(redaction_gaps(&salted).unwrap(), 4);
        assert_eq!(salted_leaves(&salted).unwrap().len(), 1);
    }

    #[test]
    fn test_bare_scalar_rejected() {
        let mut salted = salt_data(&json!({"a": 1}));
        salted["b"] = json!("plain");
        assert_eq!(
            unsalt_data(&salted),
            Err(SaltError::UnsaltedLeaf { path: "b".to_string() })
        );
        assert!(salted_leaves(&salted).is_err());
    }

    #[test]
    fn test_malformed_salt_reports_path() {
        let data = json!({"a": {"salt": "short", "value": 1}});
        match unsalt_data(&data) {
            Err(SaltError::MalformedSalt { path, .. }) => assert_eq!(path, "a"),
            other => panic!("expected MalformedSalt, got {other:?}"),
        }
    }

    #[test]
    fn test_salt_paths_cover_every_leaf() {
        let mut salter = Salter::new();
        let salts = salter.salt_paths(&sample());
        let paths: HashSet<&str> = salts.iter().map(|s| s.path.as_str()).collect();
        for expected in [
            "name", "age", "active", "nickname", "tags[0]", "tags[1]", "address.city",
            "address.lines", "meta",
        ] {
            assert!(paths.contains(expected), "missing {expected}");
        }
        assert_eq!(salts.len(), 9);
    }

    #[test]
    fn test_path_salt_serde() {
        let entry = PathSalt {
            path: "name".to_string(),
            salt: Salt::generate(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["path"], "name");
        let back: PathSalt = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
        assert!(serde_json::from_value::<PathSalt>(json!({"path": "x", "salt": "zz"})).is_err());
    }
}
