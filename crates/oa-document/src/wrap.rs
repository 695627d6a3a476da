//! # Wrapping
//!
//! Raw documents are validated, salted and hashed; the target hashes of a
//! batch are then combined into one Merkle tree whose root every document
//! carries, together with its own sibling path to that root.
//!
//! A batch must be homogeneous: all flat-salt or all proof-object, and all
//! raw. For a batch of one the Merkle root equals the target hash and the
//! proof path is empty.

use serde_json::Value;
use tracing::{debug, info};

use oa_core::{CombinationError, Digest};
use oa_crypto::MerkleTree;
use oa_schema::DocumentValidator;

use crate::error::{DocumentError, WrapError};
use crate::flat_salt::{self, SaltedPayload};
use crate::guard::{Document, FormatVariant};
use crate::proof_object::{self, SaltedCredential};

const OPERATION: &str = "wrap";

/// A salted document waiting for its batch root.
#[derive(Debug)]
enum Prepared {
    FlatSalt(SaltedPayload),
    ProofObject(SaltedCredential),
}

impl Prepared {
    fn new(document: Document<'_>) -> Result<Self, DocumentError> {
        match document {
            Document::RawFlatSalt(map) => Ok(Self::FlatSalt(flat_salt::salt_payload(
                &Value::Object(map.clone()),
            )?)),
            Document::RawProofObject(map) => {
                Ok(Self::ProofObject(proof_object::salt_credential(map)?))
            }
            Document::WrappedFlatSalt(_) | Document::WrappedProofObject(_) => {
                Err(DocumentError::UnsupportedDocumentType { operation: OPERATION })
            }
        }
    }

    fn target_hash(&self) -> Digest {
        match self {
            Self::FlatSalt(p) => p.target_hash,
            Self::ProofObject(c) => c.target_hash,
        }
    }

    fn seal(self, merkle_root: Digest, proof: Vec<Digest>) -> Result<Value, DocumentError> {
        match self {
            Self::FlatSalt(p) => flat_salt::seal(p, merkle_root, proof),
            Self::ProofObject(c) => proof_object::seal(c, merkle_root, proof),
        }
    }
}

/// Recognize every document of a batch as raw and of one variant.
fn batch_variant<'a>(
    raws: &'a [Value],
) -> Result<(FormatVariant, Vec<Document<'a>>), DocumentError> {
    let mut variant = None;
    let mut documents = Vec::with_capacity(raws.len());
    for raw in raws {
        let document = Document::recognize_for(raw, OPERATION)?;
        if document.is_wrapped() || variant.is_some_and(|v| v != document.variant()) {
            return Err(DocumentError::UnsupportedDocumentType { operation: OPERATION });
        }
        variant = Some(document.variant());
        documents.push(document);
    }
    let variant = variant.ok_or(DocumentError::HashCombination(CombinationError::Empty))?;
    Ok((variant, documents))
}

/// Wraps raw documents after validating them.
#[derive(Debug)]
pub struct Wrapper {
    validator: DocumentValidator,
}

impl Wrapper {
    /// A wrapper validating through `validator`.
    pub fn new(validator: DocumentValidator) -> Self {
        Self { validator }
    }

    /// The validator in use.
    pub fn validator(&self) -> &DocumentValidator {
        &self.validator
    }

    /// Wrap one raw document.
    ///
    /// # Errors
    ///
    /// - `Schema` if validation fails or a `@context` cannot be resolved.
    /// - `Document(UnsupportedDocumentType)` for wrapped or unrecognized input.
    /// - `Document(HashCombination)` for a document with no leaves.
    pub async fn wrap_document(&self, raw: &Value) -> Result<Value, WrapError> {
        let document = Document::recognize_for(raw, OPERATION)?;
        if document.is_wrapped() {
            return Err(DocumentError::UnsupportedDocumentType { operation: OPERATION }.into());
        }
        self.validator
            .validate(raw, document.variant().schema_version())
            .await?;

        let prepared = Prepared::new(document)?;
        let target_hash = prepared.target_hash();
        debug!(target_hash = %target_hash, "document wrapped");
        Ok(prepared.seal(target_hash, Vec::new())?)
    }

    /// Wrap a batch under one Merkle root.
    ///
    /// Every document is validated before any is salted; one failure fails
    /// the batch.
    ///
    /// # Errors
    ///
    /// As [`Wrapper::wrap_document`]; additionally `UnsupportedDocumentType`
    /// for a batch mixing variants and `HashCombination` for an empty batch.
    pub async fn wrap_documents(&self, raws: &[Value]) -> Result<Vec<Value>, WrapError> {
        let (variant, documents) = batch_variant(raws)?;
        for raw in raws {
            self.validator
                .validate(raw, variant.schema_version())
                .await?;
        }

        let prepared = documents
            .into_iter()
            .map(Prepared::new)
            .collect::<Result<Vec<_>, _>>()?;
        let targets: Vec<Digest> = prepared.iter().map(Prepared::target_hash).collect();
        let tree = MerkleTree::new(&targets).map_err(DocumentError::from)?;
        let merkle_root = tree.root();
        info!(count = prepared.len(), merkle_root = %merkle_root, "batch wrapped");

        prepared
            .into_iter()
            .map(|p| -> Result<Value, WrapError> {
                let target_hash = p.target_hash();
                let proof = tree.proof(&target_hash).ok_or_else(|| DocumentError::InvalidField {
                    operation: OPERATION,
                    field: "targetHash".to_string(),
                    reason: "not a leaf of the batch tree".to_string(),
                })?;
                Ok(p.seal(merkle_root, proof)?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_must_be_homogeneous() {
        let flat = json!({"issuers": [{"name": "x"}]});
        let proof_object = json!({"@context": [], "openAttestationMetadata": {}});
        let err = batch_variant(&[flat.clone(), proof_object]).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedDocumentType { operation: "wrap" }));

        let batch = [flat.clone(), flat];
        let (variant, docs) = batch_variant(&batch).unwrap();
        assert_eq!(variant, FormatVariant::FlatSalt);
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_wrapped_input_is_rejected() {
        let payload = flat_salt::salt_payload(&json!({"issuers": [{"name": "x"}]})).unwrap();
        let root = payload.target_hash;
        let wrapped = flat_salt::seal(payload, root, Vec::new()).unwrap();
        assert!(matches!(
            batch_variant(&[wrapped]),
            Err(DocumentError::UnsupportedDocumentType { .. })
        ));
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(batch_variant(&[]), Err(DocumentError::HashCombination(_))));
    }

    #[test]
    fn test_prepared_seals_each_variant() {
        let raw = json!({"@context": ["x"], "openAttestationMetadata": {"a": 1}});
        let prepared = Prepared::new(Document::recognize(&raw).unwrap()).unwrap();
        let target = prepared.target_hash();
        let sealed = prepared.seal(target, Vec::new()).unwrap();
        assert_eq!(sealed["proof"]["targetHash"], target.to_hex());
    }
}
