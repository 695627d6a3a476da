//! # Flat-Salt Format
//!
//! Wrapped layout:
//!
//! ```json
//! {
//!   "version": "https://schema.openattestation.com/2.0/schema.json",
//!   "data": { "name": {"salt": "<64 hex>", "value": "Alice"}, ... },
//!   "signature": {
//!     "type": "SHA256MerkleProof",
//!     "targetHash": "<hex>", "proof": ["<hex>", ...], "merkleRoot": "<hex>"
//!   },
//!   "privacy": { "obfuscatedData": ["<hex>", ...] }
//! }
//! ```
//!
//! Every scalar and every empty object or array of the raw document becomes
//! a salted leaf inside `data`. The target hash is the reduction of all leaf
//! digests, visible ones recomputed from `data` and redacted ones taken from
//! `obfuscatedData`. Redaction leaves bare `null` array elements and bare
//! emptied objects behind; there can be no more of those than obfuscated
//! digests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use oa_core::{Digest, FieldPath, SchemaVersion};
use oa_crypto::{leaf_digest, redaction_gaps, reduce, salted_leaves, SaltedValue, Salter};

use crate::error::DocumentError;
use crate::guard::{member, parse_member};
use crate::obfuscate::remove_node;
use crate::verify::{check_commitment, distinct_salts, gaps_accounted_for};

/// `signature.type` of wrapped flat-salt documents.
pub const SIGNATURE_TYPE: &str = "SHA256MerkleProof";

/// The `signature` object of a wrapped flat-salt document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Always [`SIGNATURE_TYPE`] for documents wrapped here.
    #[serde(rename = "type")]
    pub signature_type: String,
    /// Root of this document's leaves.
    pub target_hash: Digest,
    /// Sibling path from `target_hash` to `merkle_root`.
    #[serde(default)]
    pub proof: Vec<Digest>,
    /// Root of the batch the document was wrapped in.
    pub merkle_root: Digest,
}

/// The `privacy` object of a wrapped flat-salt document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Privacy {
    /// Digests of redacted leaves.
    #[serde(default)]
    pub obfuscated_data: Vec<Digest>,
}

/// A salted payload and the target hash it commits to.
#[derive(Debug, Clone, PartialEq)]
pub struct SaltedPayload {
    /// The `data` member of the wrapped document.
    pub data: Value,
    /// Reduction of every leaf digest of `data`.
    pub target_hash: Digest,
}

/// Salt a raw payload with fresh, document-unique salts.
///
/// # Errors
///
/// Returns `HashCombination` for a payload with no leaves.
pub fn salt_payload(raw: &Value) -> Result<SaltedPayload, DocumentError> {
    let data = Salter::new().salt_data(raw);
    let target_hash = target_hash(&data, &[])?;
    Ok(SaltedPayload { data, target_hash })
}

/// Digests of every visible leaf of a salted payload.
///
/// # Errors
///
/// Returns `Salt` if an unsalted scalar or a malformed salt is found.
pub fn leaf_digests(data: &Value) -> Result<Vec<Digest>, DocumentError> {
    salted_leaves(data)?
        .iter()
        .map(|(path, leaf)| Ok(leaf_digest(&path.to_string(), leaf)?))
        .collect()
}

/// Target hash of a salted payload plus the digests of its redacted leaves.
///
/// # Errors
///
/// As [`leaf_digests`]; `HashCombination` if there are no digests at all.
pub fn target_hash(data: &Value, obfuscated: &[Digest]) -> Result<Digest, DocumentError> {
    let mut digests = leaf_digests(data)?;
    digests.extend_from_slice(obfuscated);
    Ok(reduce(&digests)?)
}

/// Assemble the wrapped document.
///
/// # Errors
///
/// Returns `Serialization` if the signature cannot be serialized.
pub fn seal(
    payload: SaltedPayload,
    merkle_root: Digest,
    proof: Vec<Digest>,
) -> Result<Value, DocumentError> {
    let signature = Signature {
        signature_type: SIGNATURE_TYPE.to_string(),
        target_hash: payload.target_hash,
        proof,
        merkle_root,
    };
    let mut wrapped = Map::new();
    wrapped.insert("version".to_string(), serde_json::to_value(SchemaVersion::V2)?);
    wrapped.insert("data".to_string(), payload.data);
    wrapped.insert("signature".to_string(), serde_json::to_value(&signature)?);
    Ok(Value::Object(wrapped))
}

pub(crate) fn signature(map: &Map<String, Value>, operation: &'static str) -> Result<Signature, DocumentError> {
    parse_member(map, "signature", operation)
}

pub(crate) fn privacy(map: &Map<String, Value>, operation: &'static str) -> Result<Privacy, DocumentError> {
    if map.contains_key("privacy") {
        parse_member(map, "privacy", operation)
    } else {
        Ok(Privacy::default())
    }
}

pub(crate) fn obfuscate(document: &Map<String, Value>, paths: &[&str]) -> Result<Value, DocumentError> {
    const OPERATION: &str = "obfuscate";
    let mut privacy = privacy(document, OPERATION)?;
    let mut out = Value::Object(document.clone());

    for raw_path in paths {
        let path = FieldPath::parse(raw_path)?;
        let full = FieldPath::root().key("data").join(&path);
        // Visible nodes of a salted payload are always objects or arrays;
        // a bare null is an earlier redaction.
        let node = match full.get(&out) {
            Some(node) if node.is_object() || node.is_array() => node,
            _ => {
                return Err(DocumentError::PathNotFound {
                    path: raw_path.to_string(),
                })
            }
        };
        let removed = salted_leaves(node)?;
        for (sub, leaf) in &removed {
            privacy
                .obfuscated_data
                .push(leaf_digest(&path.join(sub).to_string(), leaf)?);
        }
        remove_node(&mut out, &full)?;
    }

    if let Value::Object(map) = &mut out {
        map.insert("privacy".to_string(), serde_json::to_value(&privacy)?);
    }
    Ok(out)
}

pub(crate) fn verify(document: &Map<String, Value>) -> Result<bool, DocumentError> {
    const OPERATION: &str = "verify_signature";
    let signature = signature(document, OPERATION)?;
    let privacy = privacy(document, OPERATION)?;
    let data = member(document, "data", OPERATION)?;

    let leaves = match salted_leaves(data) {
        Ok(leaves) => leaves,
        Err(e) => {
            warn!(error = %e, "salted payload is malformed");
            return Ok(false);
        }
    };
    if !distinct_salts(leaves.iter().map(|(_, leaf)| &leaf.salt)) {
        warn!("salt reused within one document");
        return Ok(false);
    }
    if !gaps_accounted_for(redaction_gaps(data)?, privacy.obfuscated_data.len()) {
        return Ok(false);
    }
    let mut digests = leaves
        .iter()
        .map(|(path, leaf)| leaf_digest(&path.to_string(), leaf))
        .collect::<Result<Vec<_>, _>>()?;
    digests.extend(privacy.obfuscated_data);
    check_commitment(
        &digests,
        &signature.target_hash,
        &signature.proof,
        &signature.merkle_root,
    )
}

/// The payload with salts removed, for accessors that read plain values.
pub(crate) fn unsalted_data(document: &Map<String, Value>, operation: &'static str) -> Result<Value, DocumentError> {
    Ok(oa_crypto::unsalt_data(member(document, "data", operation)?)?)
}

/// Convenience for tests and callers that know one leaf's location.
pub fn salted_leaf(data: &Value, path: &str) -> Result<SaltedValue, DocumentError> {
    let path = FieldPath::parse(path)?;
    let node = path.get(data).ok_or_else(|| DocumentError::PathNotFound {
        path: path.to_string(),
    })?;
    let mut leaves = salted_leaves(node)?;
    match (leaves.pop(), leaves.is_empty()) {
        (Some((sub, leaf)), true) if sub.is_root() => Ok(leaf),
        _ => Err(DocumentError::InvalidField {
            operation: "salted_leaf",
            field: path.to_string(),
            reason: "not a single salted leaf".to_string(),
        }),
    }
}
