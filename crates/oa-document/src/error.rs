//! Error types for document operations.

use oa_core::{CanonicalizationError, CombinationError, PathError};
use oa_crypto::SaltError;
use oa_schema::SchemaValidationError;
use thiserror::Error;

/// Error from an accessor, wrapping step, obfuscation or verification.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document matches no shape the operation accepts.
    #[error("unsupported document type: cannot {operation} this document")]
    UnsupportedDocumentType {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A field the operation depends on is absent.
    #[error("{operation}: missing field '{field}'")]
    MissingField {
        /// The operation that was attempted.
        operation: &'static str,
        /// Rendered path of the missing field.
        field: String,
    },

    /// A field is present but does not have the expected form.
    #[error("{operation}: invalid field '{field}': {reason}")]
    InvalidField {
        /// The operation that was attempted.
        operation: &'static str,
        /// Rendered path of the field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An obfuscation path does not address a visible field.
    #[error("path '{path}' does not address a visible field")]
    PathNotFound {
        /// The requested path.
        path: String,
    },

    /// A visible proof-object leaf has no salt in `proof.salts`.
    #[error("no salt recorded for '{path}'")]
    MissingSalt {
        /// Rendered path of the leaf.
        path: String,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Salt(#[from] SaltError),

    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    #[error("hash combination failed: {0}")]
    HashCombination(#[from] CombinationError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error from wrapping raw documents.
#[derive(Error, Debug)]
pub enum WrapError {
    /// Validation rejected a document, or a `@context` could not be resolved.
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl WrapError {
    /// The schema validation failure, if that is what stopped wrapping.
    pub fn as_schema_error(&self) -> Option<&SchemaValidationError> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Document(_) => None,
        }
    }
}
