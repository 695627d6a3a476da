//! # Proof-Object Format
//!
//! The credential stays readable JSON-LD; salts live in a list inside the
//! `proof` member:
//!
//! ```json
//! {
//!   "@context": [...], "type": [...], "credentialSubject": {...}, ...,
//!   "proof": {
//!     "type": "OpenAttestationMerkleProofSignature2018",
//!     "proofPurpose": "assertionMethod",
//!     "targetHash": "<hex>", "proofs": ["<hex>", ...], "merkleRoot": "<hex>",
//!     "salts": [{"path": "credentialSubject.name", "salt": "<64 hex>"}, ...],
//!     "privacy": {"obfuscated": ["<hex>", ...]}
//!   }
//! }
//! ```
//!
//! Every scalar and every empty object or array outside `proof` is a leaf;
//! its digest is computed from its rendered path, its salt from the list,
//! and its value. Redaction leaves unsalted gaps behind (`null` array
//! elements and emptied objects), and a document may hold no more gaps than
//! obfuscated digests.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use oa_core::{Digest, FieldPath, PathSegment};
use oa_crypto::{leaf_digest, reduce, PathSalt, Salt, SaltedValue, Salter};

use crate::error::DocumentError;
use crate::guard::parse_member;
use crate::obfuscate::remove_node;
use crate::verify::{check_commitment, distinct_salts, gaps_accounted_for};

/// `proof.type` of wrapped proof-object documents.
pub const PROOF_TYPE: &str = "OpenAttestationMerkleProofSignature2018";
/// `proof.proofPurpose` of wrapped proof-object documents.
pub const PROOF_PURPOSE: &str = "assertionMethod";

/// The `proof` object of a wrapped proof-object document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub proof_purpose: String,
    pub target_hash: Digest,
    #[serde(default)]
    pub proofs: Vec<Digest>,
    pub merkle_root: Digest,
    #[serde(default)]
    pub salts: Vec<PathSalt>,
    #[serde(default)]
    pub privacy: Privacy,
}

/// `proof.privacy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privacy {
    /// Digests of redacted leaves.
    #[serde(default)]
    pub obfuscated: Vec<Digest>,
}

/// A raw credential with its salt list and target hash.
#[derive(Debug, Clone, PartialEq)]
pub struct SaltedCredential {
    /// The raw credential, unchanged.
    pub document: Map<String, Value>,
    /// One salt per leaf.
    pub salts: Vec<PathSalt>,
    /// Reduction of every leaf digest.
    pub target_hash: Digest,
}

/// Draw salts for every leaf of a raw credential.
///
/// # Errors
///
/// Returns `HashCombination` for a credential with no leaves.
pub fn salt_credential(raw: &Map<String, Value>) -> Result<SaltedCredential, DocumentError> {
    let salts = Salter::new().salt_paths(&Value::Object(raw.clone()));
    let target_hash = reduce(&leaf_digests(raw, &salts)?)?;
    Ok(SaltedCredential {
        document: raw.clone(),
        salts,
        target_hash,
    })
}

/// Assemble the wrapped document.
///
/// # Errors
///
/// Returns `Serialization` if the proof cannot be serialized.
pub fn seal(
    credential: SaltedCredential,
    merkle_root: Digest,
    proofs: Vec<Digest>,
) -> Result<Value, DocumentError> {
    let proof = MerkleProof {
        proof_type: PROOF_TYPE.to_string(),
        proof_purpose: PROOF_PURPOSE.to_string(),
        target_hash: credential.target_hash,
        proofs,
        merkle_root,
        salts: credential.salts,
        privacy: Privacy::default(),
    };
    let mut wrapped = credential.document;
    wrapped.insert("proof".to_string(), serde_json::to_value(&proof)?);
    Ok(Value::Object(wrapped))
}

struct Scalar<'v> {
    path: FieldPath,
    value: &'v Value,
    in_array: bool,
}

impl Scalar<'_> {
    /// An unsalted `null` array element or empty container can be a gap
    /// left by redaction.
    fn may_be_gap(&self) -> bool {
        match self.value {
            Value::Null => self.in_array,
            Value::Object(_) | Value::Array(_) => true,
            _ => false,
        }
    }
}

fn collect_scalars<'v>(node: &'v Value, path: FieldPath, in_array: bool, out: &mut Vec<Scalar<'v>>) {
    match node {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                collect_scalars(child, path.key(key), false, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                collect_scalars(child, path.index(i), true, out);
            }
        }
        _ => out.push(Scalar {
            path,
            value: node,
            in_array,
        }),
    }
}

fn visible_scalars(document: &Map<String, Value>) -> Vec<Scalar<'_>> {
    let mut out = Vec::new();
    for (key, value) in document {
        if key != "proof" {
            collect_scalars(value, FieldPath::root().key(key), false, &mut out);
        }
    }
    out
}

/// Leaf digests of a set of scalars, and the number of redaction gaps
/// among them.
struct Digested {
    digests: Vec<Digest>,
    gaps: usize,
}

fn digest_scalars(scalars: &[Scalar<'_>], salts: &HashMap<&str, &Salt>) -> Result<Digested, DocumentError> {
    let mut out = Digested {
        digests: Vec::with_capacity(scalars.len()),
        gaps: 0,
    };
    for scalar in scalars {
        let path = scalar.path.to_string();
        match salts.get(path.as_str()) {
            Some(salt) => {
                let leaf = SaltedValue::new((*salt).clone(), scalar.value.clone());
                out.digests.push(leaf_digest(&path, &leaf)?);
            }
            None if scalar.may_be_gap() => out.gaps += 1,
            None => return Err(DocumentError::MissingSalt { path }),
        }
    }
    Ok(out)
}

fn salts_by_path(salts: &[PathSalt]) -> HashMap<&str, &Salt> {
    salts.iter().map(|s| (s.path.as_str(), &s.salt)).collect()
}

/// Digests of every visible leaf (everything outside `proof`).
///
/// # Errors
///
/// Returns `MissingSalt` for a leaf with no entry in `salts`.
pub fn leaf_digests(document: &Map<String, Value>, salts: &[PathSalt]) -> Result<Vec<Digest>, DocumentError> {
    Ok(digest_scalars(&visible_scalars(document), &salts_by_path(salts))?.digests)
}

pub(crate) fn merkle_proof(map: &Map<String, Value>, operation: &'static str) -> Result<MerkleProof, DocumentError> {
    parse_member(map, "proof", operation)
}

/// Read-modify-write of the two `proof` members obfuscation touches,
/// leaving any other `proof` members alone.
fn store_redactions(out: &mut Value, salts: &[PathSalt], obfuscated: &[Digest]) -> Result<(), DocumentError> {
    let salts = serde_json::to_value(salts)?;
    let obfuscated = serde_json::to_value(obfuscated)?;
    if let Some(Value::Object(proof)) = out.get_mut("proof") {
        proof.insert("salts".to_string(), salts);
        match proof.get_mut("privacy") {
            Some(Value::Object(privacy)) => {
                privacy.insert("obfuscated".to_string(), obfuscated);
            }
            _ => {
                let mut privacy = Map::new();
                privacy.insert("obfuscated".to_string(), obfuscated);
                proof.insert("privacy".to_string(), Value::Object(privacy));
            }
        }
    }
    Ok(())
}

pub(crate) fn obfuscate(document: &Map<String, Value>, paths: &[&str]) -> Result<Value, DocumentError> {
    const OPERATION: &str = "obfuscate";
    let proof = merkle_proof(document, OPERATION)?;
    let mut salts = proof.salts;
    let mut obfuscated = proof.privacy.obfuscated;
    let mut out = Value::Object(document.clone());

    for raw_path in paths {
        let path = FieldPath::parse(raw_path)?;
        if matches!(path.segments().first(), Some(PathSegment::Key(k)) if k == "proof") {
            return Err(DocumentError::InvalidField {
                operation: OPERATION,
                field: raw_path.to_string(),
                reason: "the proof object cannot be obfuscated".to_string(),
            });
        }
        let not_found = || DocumentError::PathNotFound {
            path: raw_path.to_string(),
        };
        let node = path.get(&out).ok_or_else(not_found)?;

        let mut scalars = Vec::new();
        let in_array = matches!(path.segments().last(), Some(PathSegment::Index(_)));
        collect_scalars(node, path.clone(), in_array, &mut scalars);

        let removed: HashSet<String> = scalars.iter().map(|s| s.path.to_string()).collect();
        let by_path = salts_by_path(&salts);
        let placeholder = node.is_null() && in_array && !by_path.contains_key(path.to_string().as_str());
        if placeholder {
            return Err(not_found());
        }
        obfuscated.extend(digest_scalars(&scalars, &by_path)?.digests);
        salts.retain(|s| !removed.contains(&s.path));
        remove_node(&mut out, &path)?;
    }

    store_redactions(&mut out, &salts, &obfuscated)?;
    Ok(out)
}

pub(crate) fn verify(document: &Map<String, Value>) -> Result<bool, DocumentError> {
    let proof = merkle_proof(document, "verify_signature")?;
    if !distinct_salts(proof.salts.iter().map(|s| &s.salt)) {
        warn!("salt reused within one document");
        return Ok(false);
    }
    let by_path = salts_by_path(&proof.salts);
    if by_path.len() != proof.salts.len() {
        warn!("salt list names one path twice");
        return Ok(false);
    }
    let Digested { mut digests, gaps } = match digest_scalars(&visible_scalars(document), &by_path) {
        Ok(digested) => digested,
        Err(DocumentError::MissingSalt { path }) => {
            warn!(path = %path, "visible field has no salt");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    if !gaps_accounted_for(gaps, proof.privacy.obfuscated.len()) {
        return Ok(false);
    }
    digests.extend(proof.privacy.obfuscated.iter().copied());
    check_commitment(&digests, &proof.target_hash, &proof.proofs, &proof.merkle_root)
}

/// The credential without its `proof` member.
pub(crate) fn credential_data(document: &Map<String, Value>) -> Value {
    Value::Object(
        document
            .iter()
            .filter(|(key, _)| key.as_str() != "proof")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credential() -> Map<String, Value> {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential"],
            "credentialSubject": {"name": "Alice", "age": 30, "nick": null, "langs": ["en", "fr"]},
            "openAttestationMetadata": {"proof": {"method": "DID", "value": "did:ethr:0xabc"}}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn wrapped() -> Value {
        let salted = salt_credential(&credential()).unwrap();
        let root = salted.target_hash;
        seal(salted, root, Vec::new()).unwrap()
    }

    fn verify_value(doc: &Value) -> bool {
        verify(doc.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_one_salt_per_leaf() {
        let salted = salt_credential(&credential()).unwrap();
        let mut paths: Vec<&str> = salted.salts.iter().map(|s| s.path.as_str()).collect();
        paths.sort_unstable();
        assert_eq!(
            paths,
            vec![
                "@context[0]",
                "credentialSubject.age",
                "credentialSubject.langs[0]",
                "credentialSubject.langs[1]",
                "credentialSubject.name",
                "credentialSubject.nick",
                "openAttestationMetadata.proof.method",
                "openAttestationMetadata.proof.value",
                "type[0]",
            ]
        );
    }

    #[test]
    fn test_seal_layout() {
        let doc = wrapped();
        assert_eq!(doc["proof"]["type"], PROOF_TYPE);
        assert_eq!(doc["proof"]["proofPurpose"], PROOF_PURPOSE);
        assert_eq!(doc["proof"]["privacy"], json!({"obfuscated": []}));
        assert_eq!(doc["proof"]["targetHash"], doc["proof"]["merkleRoot"]);
        assert_eq!(doc["credentialSubject"]["name"], "Alice");
        assert!(verify_value(&doc));
    }

    #[test]
    fn test_obfuscate_drops_salts_and_keeps_root() {
        let doc = wrapped();
        let out = obfuscate(
            doc.as_object().unwrap(),
            &["credentialSubject.age", "credentialSubject.langs[1]"],
        )
        .unwrap();
        assert!(out["credentialSubject"].get("age").is_none());
        assert_eq!(out["credentialSubject"]["langs"], json!(["en", null]));
        let salts = out["proof"]["salts"].as_array().unwrap();
        assert_eq!(salts.len(), 7);
        assert!(salts.iter().all(|s| s["path"] != "credentialSubject.age"));
        assert_eq!(out["proof"]["privacy"]["obfuscated"].as_array().unwrap().len(), 2);
        assert!(verify_value(&out));
    }

    #[test]
    fn test_placeholder_cannot_be_obfuscated_again() {
        let doc = wrapped();
        let once = obfuscate(doc.as_object().unwrap(), &["credentialSubject.langs[0]"]).unwrap();
        let err = obfuscate(once.as_object().unwrap(), &["credentialSubject.langs[0]"]).unwrap_err();
        assert!(matches!(err, DocumentError::PathNotFound { .. }));
    }

    #[test]
    fn test_proof_is_not_obfuscatable() {
        let doc = wrapped();
        let err = obfuscate(doc.as_object().unwrap(), &["proof.salts"]).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidField { .. }));
    }

    #[test]
    fn test_tampering_is_detected() {
        let doc = wrapped();

        let mut changed = doc.clone();
        changed["credentialSubject"]["age"] = json!(31);
        assert!(!verify_value(&changed));

        let mut added = doc.clone();
        added["credentialSubject"]["extra"] = json!("no salt");
        assert!(!verify_value(&added));

        let mut reused = doc.clone();
        let first = reused["proof"]["salts"][0]["salt"].clone();
        reused["proof"]["salts"][1]["salt"] = first;
        assert!(!verify_value(&reused));
    }

    fn seal_raw(raw: Value) -> Value {
        let salted = salt_credential(raw.as_object().unwrap()).unwrap();
        let root = salted.target_hash;
        seal(salted, root, Vec::new()).unwrap()
    }

    #[test]
    fn test_dotted_key_and_nested_path_get_separate_salts() {
        let mut raw = Value::Object(credential());
        raw["credentialSubject"] = json!({"a.b": "first", "a": {"b": "second"}});
        let doc = seal_raw(raw);
        let paths: HashSet<&str> = doc["proof"]["salts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["path"].as_str().unwrap())
            .collect();
        assert!(paths.contains(r#"credentialSubject["a.b"]"#));
        assert!(paths.contains("credentialSubject.a.b"));
        assert!(verify_value(&doc));

        let mut swapped = doc.clone();
        swapped["credentialSubject"]["a.b"] = json!("second");
        swapped["credentialSubject"]["a"]["b"] = json!("first");
        assert!(!verify_value(&swapped));

        let redacted = obfuscate(doc.as_object().unwrap(), &[r#"credentialSubject["a.b"]"#]).unwrap();
        assert!(redacted["credentialSubject"].get("a.b").is_none());
        assert_eq!(redacted["credentialSubject"]["a"]["b"], "second");
        assert!(verify_value(&redacted));
    }

    #[test]
    fn test_salt_list_naming_a_path_twice_is_rejected() {
        let doc = wrapped();
        let mut doubled = doc.clone();
        let salts = doubled["proof"]["salts"].as_array_mut().unwrap();
        let mut extra = salts[0].clone();
        extra["salt"] = json!(Salt::generate().as_str());
        salts.push(extra);
        assert!(!verify_value(&doubled));
    }

    #[test]
    fn test_empty_containers_are_committed() {
        let mut raw = Value::Object(credential());
        raw["credentialSubject"]["roles"] = json!([]);
        raw["credentialSubject"]["extra"] = json!({});
        let doc = seal_raw(raw);
        let salts = doc["proof"]["salts"].as_array().unwrap();
        assert!(salts.iter().any(|s| s["path"] == "credentialSubject.roles"));
        assert!(salts.iter().any(|s| s["path"] == "credentialSubject.extra"));
        assert!(verify_value(&doc));

        let mut dropped = doc.clone();
        dropped["credentialSubject"].as_object_mut().unwrap().remove("roles");
        assert!(!verify_value(&dropped));

        let out = obfuscate(doc.as_object().unwrap(), &["credentialSubject.extra"]).unwrap();
        assert!(verify_value(&out));
    }

    #[test]
    fn test_unaccounted_gaps_are_detected() {
        let doc = wrapped();

        let mut roles = doc.clone();
        roles["credentialSubject"]["roles"] = json!([]);
        assert!(!verify_value(&roles));

        let mut extra = doc.clone();
        extra["credentialSubject"]["extra"] = json!({});
        assert!(!verify_value(&extra));

        let mut appended = doc.clone();
        appended["credentialSubject"]["langs"].as_array_mut().unwrap().push(Value::Null);
        assert!(!verify_value(&appended));

        let emptied = obfuscate(
            doc.as_object().unwrap(),
            &[
                "openAttestationMetadata.proof.method",
                "openAttestationMetadata.proof.value",
                "credentialSubject.langs[1]",
            ],
        )
        .unwrap();
        assert_eq!(emptied["openAttestationMetadata"]["proof"], json!({}));
        assert!(verify_value(&emptied));
    }

    #[test]
    fn test_credential_data_strips_proof() {
        let doc = wrapped();
        let data = credential_data(doc.as_object().unwrap());
        assert_eq!(data, Value::Object(credential()));
    }
}
