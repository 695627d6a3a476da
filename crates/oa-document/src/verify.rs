//! # Signature Verification
//!
//! A wrapped document verifies when the reduction of its visible leaf
//! digests and its obfuscated digests equals the stored target hash, and
//! the stored proof path leads from that target hash to the Merkle root.
//!
//! Tampering yields `Ok(false)`, never an error. Changed values, fields
//! added without a salt, missing or reused salts, and redaction gaps
//! (`null` array elements, emptied containers) beyond the number of
//! obfuscated digests all count.
//! Errors are reserved for documents that are not wrapped documents at
//! all, or whose proof members cannot be parsed.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use oa_core::Digest;
use oa_crypto::{reduce, verify_proof, Salt};

use crate::error::DocumentError;
use crate::guard::Document;
use crate::{flat_salt, proof_object};

/// Check a wrapped document's target hash and Merkle proof.
///
/// # Errors
///
/// Returns `UnsupportedDocumentType` for raw or unrecognized documents and
/// `InvalidField` if the signature or proof object is malformed.
pub fn verify_signature(document: &Value) -> Result<bool, DocumentError> {
    const OPERATION: &str = "verify_signature";
    match Document::recognize_for(document, OPERATION)? {
        Document::WrappedFlatSalt(map) => flat_salt::verify(map),
        Document::WrappedProofObject(map) => proof_object::verify(map),
        Document::RawFlatSalt(_) | Document::RawProofObject(_) => {
            Err(DocumentError::UnsupportedDocumentType { operation: OPERATION })
        }
    }
}

pub(crate) fn distinct_salts<'a>(salts: impl IntoIterator<Item = &'a Salt>) -> bool {
    let mut seen = HashSet::new();
    salts.into_iter().all(|salt| seen.insert(salt))
}

/// Every redaction gap consumed at least one obfuscated digest.
pub(crate) fn gaps_accounted_for(gaps: usize, obfuscated: usize) -> bool {
    if gaps > obfuscated {
        warn!(gaps, obfuscated, "more redaction gaps than obfuscated digests");
        return false;
    }
    true
}

pub(crate) fn check_commitment(
    digests: &[Digest],
    target_hash: &Digest,
    proof: &[Digest],
    merkle_root: &Digest,
) -> Result<bool, DocumentError> {
    let computed = reduce(digests)?;
    if computed != *target_hash {
        warn!(expected = %target_hash, computed = %computed, "target hash mismatch");
        return Ok(false);
    }
    if !verify_proof(target_hash, proof, merkle_root) {
        warn!(target_hash = %target_hash, merkle_root = %merkle_root, "proof does not lead to merkle root");
        return Ok(false);
    }
    debug!(target_hash = %target_hash, leaves = digests.len(), "signature verified");
    Ok(true)
}
