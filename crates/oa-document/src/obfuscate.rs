//! # Obfuscation
//!
//! Removes fields from a wrapped document while keeping it verifiable: the
//! digest of every removed leaf is recorded in the variant's obfuscated
//! list, so the target hash can still be recomputed.
//!
//! Object members are deleted outright. Array elements are replaced by a
//! `null` placeholder so that the paths of their siblings, which are part
//! of every leaf digest, stay the same.

use serde_json::Value;

use oa_core::{FieldPath, PathSegment};

use crate::error::DocumentError;
use crate::guard::Document;
use crate::{flat_salt, proof_object};

/// Redact `paths` (whole subtrees allowed) from a wrapped document.
///
/// Paths are relative to the visible payload: the `data` member of a
/// flat-salt document, the document itself for a proof-object document.
///
/// # Errors
///
/// - `UnsupportedDocumentType` for anything but a wrapped document.
/// - `PathNotFound` for a path that addresses no visible field.
/// - `Path` for a malformed path.
pub fn obfuscate(document: &Value, paths: &[&str]) -> Result<Value, DocumentError> {
    const OPERATION: &str = "obfuscate";
    match Document::recognize_for(document, OPERATION)? {
        Document::WrappedFlatSalt(map) => flat_salt::obfuscate(map, paths),
        Document::WrappedProofObject(map) => proof_object::obfuscate(map, paths),
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => {
            Err(DocumentError::UnsupportedDocumentType { operation: OPERATION })
        }
    }
}

/// Detach the node at `path`: delete an object member, null an array slot.
pub(crate) fn remove_node(root: &mut Value, path: &FieldPath) -> Result<(), DocumentError> {
    let not_found = || DocumentError::PathNotFound {
        path: path.to_string(),
    };
    let (parent, last) = path.split_last().ok_or_else(not_found)?;
    match (parent.get_mut(root).ok_or_else(not_found)?, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.remove(key).ok_or_else(not_found)?;
        }
        (Value::Array(items), PathSegment::Index(i)) => {
            let slot = items.get_mut(*i).ok_or_else(not_found)?;
            *slot = Value::Null;
        }
        _ => return Err(not_found()),
    }
    Ok(())
}
