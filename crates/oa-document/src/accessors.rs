//! # Accessors
//!
//! Uniform read access across both formats. Each accessor dispatches on the
//! recognized [`Document`] shape with an exhaustive match and fails with
//! `UnsupportedDocumentType` for shapes it does not serve. No accessor
//! falls back to a default for a document it does not understand.
//!
//! | Accessor | Shapes served |
//! |---|---|
//! | [`get_merkle_root`], [`get_target_hash`], [`get_asset_id`] | wrapped |
//! | [`get_issuer_address`], [`get_issuer_addresses`] | wrapped |
//! | [`is_transferable_asset`], [`is_document_revokable`] | wrapped |
//! | [`get_document_data`], [`is_obfuscated`], [`get_obfuscated_data`] | wrapped |
//! | [`get_template_url`] | raw and wrapped |

use serde_json::{Map, Value};

use oa_core::Digest;

use crate::error::DocumentError;
use crate::guard::{member, Document};
use crate::{flat_salt, proof_object};

const TOKEN_REGISTRY: &str = "TOKEN_REGISTRY";
const DOCUMENT_STORE: &str = "DOCUMENT_STORE";
const DID: &str = "DID";
const REVOCATION_STORE: &str = "REVOCATION_STORE";

/// Issuer members that hold a registry address, in lookup order.
const ISSUER_ADDRESS_MEMBERS: [&str; 3] = ["certificateStore", "documentStore", "tokenRegistry"];

fn unsupported(operation: &'static str) -> DocumentError {
    DocumentError::UnsupportedDocumentType { operation }
}

/// The batch Merkle root.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is wrapped.
pub fn get_merkle_root(document: &Value) -> Result<Digest, DocumentError> {
    const OPERATION: &str = "get_merkle_root";
    match Document::recognize_for(document, OPERATION)? {
        Document::WrappedFlatSalt(map) => Ok(flat_salt::signature(map, OPERATION)?.merkle_root),
        Document::WrappedProofObject(map) => {
            Ok(proof_object::merkle_proof(map, OPERATION)?.merkle_root)
        }
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(OPERATION)),
    }
}

/// The document's own target hash.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is wrapped.
pub fn get_target_hash(document: &Value) -> Result<Digest, DocumentError> {
    target_hash_for(document, "get_target_hash")
}

fn target_hash_for(document: &Value, operation: &'static str) -> Result<Digest, DocumentError> {
    match Document::recognize_for(document, operation)? {
        Document::WrappedFlatSalt(map) => Ok(flat_salt::signature(map, operation)?.target_hash),
        Document::WrappedProofObject(map) => {
            Ok(proof_object::merkle_proof(map, operation)?.target_hash)
        }
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(operation)),
    }
}

fn issuers(data: &Value, operation: &'static str) -> Result<Vec<Map<String, Value>>, DocumentError> {
    let missing = || DocumentError::MissingField {
        operation,
        field: "issuers".to_string(),
    };
    let list = data.get("issuers").and_then(Value::as_array).ok_or_else(missing)?;
    if list.is_empty() {
        return Err(missing());
    }
    list.iter()
        .enumerate()
        .map(|(i, issuer)| {
            issuer
                .as_object()
                .cloned()
                .ok_or_else(|| DocumentError::InvalidField {
                    operation,
                    field: format!("issuers[{i}]"),
                    reason: "issuer is not an object".to_string(),
                })
        })
        .collect()
}

/// A string member, treating `""` as absent.
fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn issuer_address(issuer: &Map<String, Value>) -> Option<String> {
    ISSUER_ADDRESS_MEMBERS
        .iter()
        .find_map(|key| non_empty_str(issuer, key))
        .map(str::to_string)
}

fn proof_method_field<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    operation: &'static str,
) -> Result<&'a Value, DocumentError> {
    let proof = member(map, "openAttestationMetadata", operation)?
        .get("proof")
        .and_then(Value::as_object)
        .ok_or_else(|| DocumentError::MissingField {
            operation,
            field: "openAttestationMetadata.proof".to_string(),
        })?;
    member(proof, key, operation).map_err(|_| DocumentError::MissingField {
        operation,
        field: format!("openAttestationMetadata.proof.{key}"),
    })
}

fn proof_method_str<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    operation: &'static str,
) -> Result<&'a str, DocumentError> {
    proof_method_field(map, key, operation)?
        .as_str()
        .ok_or_else(|| DocumentError::InvalidField {
            operation,
            field: format!("openAttestationMetadata.proof.{key}"),
            reason: "expected a string".to_string(),
        })
}

/// The issuing registry address: the first issuer's store or registry for
/// flat-salt documents, `openAttestationMetadata.proof.value` otherwise.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless wrapped; `MissingField` if the first
/// issuer names no address.
pub fn get_issuer_address(document: &Value) -> Result<String, DocumentError> {
    const OPERATION: &str = "get_issuer_address";
    match Document::recognize_for(document, OPERATION)? {
        Document::WrappedFlatSalt(map) => {
            let data = flat_salt::unsalted_data(map, OPERATION)?;
            let first = issuers(&data, OPERATION)?.swap_remove(0);
            issuer_address(&first).ok_or_else(|| DocumentError::MissingField {
                operation: OPERATION,
                field: "issuers[0].documentStore".to_string(),
            })
        }
        Document::WrappedProofObject(map) => {
            Ok(proof_method_str(map, "value", OPERATION)?.to_string())
        }
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(OPERATION)),
    }
}

/// Every issuer's registry address, `None` for issuers without one.
///
/// # Errors
///
/// As [`get_issuer_address`], except that issuers without an address are
/// reported as `None`.
pub fn get_issuer_addresses(document: &Value) -> Result<Vec<Option<String>>, DocumentError> {
    const OPERATION: &str = "get_issuer_addresses";
    match Document::recognize_for(document, OPERATION)? {
        Document::WrappedFlatSalt(map) => {
            let data = flat_salt::unsalted_data(map, OPERATION)?;
            Ok(issuers(&data, OPERATION)?.iter().map(issuer_address).collect())
        }
        Document::WrappedProofObject(map) => {
            Ok(vec![Some(proof_method_str(map, "value", OPERATION)?.to_string())])
        }
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(OPERATION)),
    }
}

fn template_url(template: Option<&Value>) -> Option<String> {
    template?.get("url")?.as_str().map(str::to_string)
}

/// The renderer template URL, if the document names one.
///
/// String templates (bare template names) have no URL and yield `None`.
///
/// # Errors
///
/// `UnsupportedDocumentType` for unrecognized documents.
pub fn get_template_url(document: &Value) -> Result<Option<String>, DocumentError> {
    const OPERATION: &str = "get_template_url";
    match Document::recognize_for(document, OPERATION)? {
        Document::RawFlatSalt(map) => Ok(template_url(map.get("$template"))),
        Document::WrappedFlatSalt(map) => {
            let data = flat_salt::unsalted_data(map, OPERATION)?;
            Ok(template_url(data.get("$template")))
        }
        Document::RawProofObject(map) | Document::WrappedProofObject(map) => Ok(template_url(
            member(map, "openAttestationMetadata", OPERATION)?.get("template"),
        )),
    }
}

/// The plain document content: unsalted `data`, or the credential without
/// its `proof`.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is wrapped.
pub fn get_document_data(document: &Value) -> Result<Value, DocumentError> {
    const OPERATION: &str = "get_document_data";
    match Document::recognize_for(document, OPERATION)? {
        Document::WrappedFlatSalt(map) => flat_salt::unsalted_data(map, OPERATION),
        Document::WrappedProofObject(map) => Ok(proof_object::credential_data(map)),
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(OPERATION)),
    }
}

fn transferable(document: &Document<'_>, operation: &'static str) -> Result<bool, DocumentError> {
    match document {
        Document::WrappedFlatSalt(map) => {
            let data = flat_salt::unsalted_data(map, operation)?;
            let first = issuers(&data, operation)?.swap_remove(0);
            Ok(non_empty_str(&first, "tokenRegistry").is_some())
        }
        Document::WrappedProofObject(map) => {
            Ok(proof_method_str(map, "method", operation)? == TOKEN_REGISTRY)
        }
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(operation)),
    }
}

/// Returns true if the document is a transferable record: its first issuer
/// has a token registry, or its proof method is `TOKEN_REGISTRY`.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is wrapped.
pub fn is_transferable_asset(document: &Value) -> Result<bool, DocumentError> {
    const OPERATION: &str = "is_transferable_asset";
    transferable(&Document::recognize_for(document, OPERATION)?, OPERATION)
}

/// Returns true if the issuer can revoke the document.
///
/// Transferable records are never revocable. Otherwise a flat-salt document
/// is revocable when its first issuer has a certificate or document store,
/// or a `REVOCATION_STORE` revocation block; a proof-object document when it
/// is `DID`-anchored with a `REVOCATION_STORE` revocation, or
/// `DOCUMENT_STORE`-anchored with a non-empty store address.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is wrapped.
pub fn is_document_revokable(document: &Value) -> Result<bool, DocumentError> {
    const OPERATION: &str = "is_document_revokable";
    let recognized = Document::recognize_for(document, OPERATION)?;
    if transferable(&recognized, OPERATION)? {
        return Ok(false);
    }
    match recognized {
        Document::WrappedFlatSalt(map) => {
            let data = flat_salt::unsalted_data(map, OPERATION)?;
            let first = issuers(&data, OPERATION)?.swap_remove(0);
            let has_store = ["certificateStore", "documentStore"]
                .iter()
                .any(|key| non_empty_str(&first, key).is_some());
            let revocation_store = first
                .get("revocation")
                .and_then(|r| r.get("type"))
                .and_then(Value::as_str)
                == Some(REVOCATION_STORE);
            Ok(has_store || revocation_store)
        }
        Document::WrappedProofObject(map) => {
            let method = proof_method_str(map, "method", OPERATION)?;
            let revocation_store = proof_method_field(map, "revocation", OPERATION)
                .ok()
                .and_then(|r| r.get("type"))
                .and_then(Value::as_str)
                == Some(REVOCATION_STORE);
            let has_value = proof_method_field(map, "value", OPERATION)
                .ok()
                .and_then(Value::as_str)
                .is_some_and(|v| !v.is_empty());
            Ok((method == DID && revocation_store) || (method == DOCUMENT_STORE && has_value))
        }
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(OPERATION)),
    }
}

/// The asset id of a transferable record, which is its target hash.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is a wrapped transferable
/// record.
pub fn get_asset_id(document: &Value) -> Result<Digest, DocumentError> {
    const OPERATION: &str = "get_asset_id";
    if !transferable(&Document::recognize_for(document, OPERATION)?, OPERATION)? {
        return Err(unsupported(OPERATION));
    }
    target_hash_for(document, OPERATION)
}

fn obfuscated_for(document: &Value, operation: &'static str) -> Result<Vec<Digest>, DocumentError> {
    match Document::recognize_for(document, operation)? {
        Document::WrappedFlatSalt(map) => Ok(flat_salt::privacy(map, operation)?.obfuscated_data),
        Document::WrappedProofObject(map) => {
            Ok(proof_object::merkle_proof(map, operation)?.privacy.obfuscated)
        }
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => Err(unsupported(operation)),
    }
}

/// Returns true if any field has been redacted.
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is wrapped.
pub fn is_obfuscated(document: &Value) -> Result<bool, DocumentError> {
    Ok(!obfuscated_for(document, "is_obfuscated")?.is_empty())
}

/// Digests of the redacted leaves (empty when nothing was redacted).
///
/// # Errors
///
/// `UnsupportedDocumentType` unless the document is wrapped.
pub fn get_obfuscated_data(document: &Value) -> Result<Vec<Digest>, DocumentError> {
    obfuscated_for(document, "get_obfuscated_data")
}
