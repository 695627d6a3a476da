//! # Structural Recognition
//!
//! A document is classified by its shape, never by a version tag. The four
//! shapes are disjoint; wrapped shapes are tested first because a wrapped
//! document also carries most of the members of its raw form.
//!
//! | Shape | Members |
//! |---|---|
//! | wrapped flat-salt | `data` object, `signature` object with string `targetHash` and `merkleRoot` |
//! | raw flat-salt | `issuers` array, none of `data`, `signature`, `@context` |
//! | wrapped proof-object | `@context` array, `openAttestationMetadata` object, `proof` object with string `targetHash` and `merkleRoot` |
//! | raw proof-object | `@context` array, `openAttestationMetadata` object, no `proof` |

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use oa_core::SchemaVersion;

use crate::error::DocumentError;

/// The two document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVariant {
    /// Salts embedded next to every value in a `data` payload.
    FlatSalt,
    /// Plain JSON-LD credential with salts listed in a `proof` object.
    ProofObject,
}

impl FormatVariant {
    /// The schema generation raw documents of this variant validate against.
    pub fn schema_version(&self) -> SchemaVersion {
        match self {
            Self::FlatSalt => SchemaVersion::V2,
            Self::ProofObject => SchemaVersion::V3,
        }
    }
}

/// A recognized document, borrowing the underlying JSON object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Document<'a> {
    /// Unsalted flat-salt payload, ready to wrap.
    RawFlatSalt(&'a Map<String, Value>),
    /// Salted `data` plus `signature`.
    WrappedFlatSalt(&'a Map<String, Value>),
    /// JSON-LD credential, ready to wrap.
    RawProofObject(&'a Map<String, Value>),
    /// JSON-LD credential plus `proof`.
    WrappedProofObject(&'a Map<String, Value>),
}

impl<'a> Document<'a> {
    /// Classify `value`, or `None` if it matches no known shape.
    pub fn recognize(value: &'a Value) -> Option<Self> {
        let map = value.as_object()?;
        if is_wrapped_flat_salt(map) {
            Some(Self::WrappedFlatSalt(map))
        } else if is_wrapped_proof_object(map) {
            Some(Self::WrappedProofObject(map))
        } else if is_raw_flat_salt(map) {
            Some(Self::RawFlatSalt(map))
        } else if is_raw_proof_object(map) {
            Some(Self::RawProofObject(map))
        } else {
            None
        }
    }

    /// Classify `value` on behalf of `operation`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::UnsupportedDocumentType` naming `operation`
    /// if the shape is not recognized.
    pub fn recognize_for(value: &'a Value, operation: &'static str) -> Result<Self, DocumentError> {
        Self::recognize(value).ok_or(DocumentError::UnsupportedDocumentType { operation })
    }

    /// Which format this document belongs to.
    pub fn variant(&self) -> FormatVariant {
        match self {
            Self::RawFlatSalt(_) | Self::WrappedFlatSalt(_) => FormatVariant::FlatSalt,
            Self::RawProofObject(_) | Self::WrappedProofObject(_) => FormatVariant::ProofObject,
        }
    }

    /// Returns true for the two wrapped shapes.
    pub fn is_wrapped(&self) -> bool {
        matches!(self, Self::WrappedFlatSalt(_) | Self::WrappedProofObject(_))
    }

    /// The document's top-level object.
    pub fn as_map(&self) -> &'a Map<String, Value> {
        match self {
            Self::RawFlatSalt(m)
            | Self::WrappedFlatSalt(m)
            | Self::RawProofObject(m)
            | Self::WrappedProofObject(m) => m,
        }
    }
}

fn has_root_and_target(map: &Map<String, Value>, member: &str) -> bool {
    map.get(member)
        .and_then(Value::as_object)
        .is_some_and(|obj| {
            obj.get("targetHash").is_some_and(Value::is_string)
                && obj.get("merkleRoot").is_some_and(Value::is_string)
        })
}

fn is_wrapped_flat_salt(map: &Map<String, Value>) -> bool {
    map.get("data").is_some_and(Value::is_object) && has_root_and_target(map, "signature")
}

fn is_raw_flat_salt(map: &Map<String, Value>) -> bool {
    map.get("issuers").is_some_and(Value::is_array)
        && !map.contains_key("data")
        && !map.contains_key("signature")
        && !map.contains_key("@context")
}

fn is_proof_object_body(map: &Map<String, Value>) -> bool {
    map.get("@context").is_some_and(Value::is_array)
        && map
            .get("openAttestationMetadata")
            .is_some_and(Value::is_object)
}

fn is_wrapped_proof_object(map: &Map<String, Value>) -> bool {
    is_proof_object_body(map) && has_root_and_target(map, "proof")
}

fn is_raw_proof_object(map: &Map<String, Value>) -> bool {
    is_proof_object_body(map) && !map.contains_key("proof")
}

/// Look up a mandatory member.
pub(crate) fn member<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    operation: &'static str,
) -> Result<&'a Value, DocumentError> {
    map.get(key).ok_or_else(|| DocumentError::MissingField {
        operation,
        field: key.to_string(),
    })
}

/// Deserialize a mandatory member.
pub(crate) fn parse_member<T: DeserializeOwned>(
    map: &Map<String, Value>,
    key: &str,
    operation: &'static str,
) -> Result<T, DocumentError> {
    serde_json::from_value(member(map, key, operation)?.clone()).map_err(|e| {
        DocumentError::InvalidField {
            operation,
            field: key.to_string(),
            reason: e.to_string(),
        }
    })
}
