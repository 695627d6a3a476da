//! # oa-document — Tamper-Evident, Redactable Documents
//!
//! Two document formats share one commitment scheme: every scalar leaf is
//! salted and hashed, leaf digests reduce to a per-document target hash,
//! and the target hashes of a batch reduce to a Merkle root.
//!
//! - **Flat-salt** ([`flat_salt`]): salts sit next to every value inside
//!   `data`; the commitment lives in `signature`.
//! - **Proof-object** ([`proof_object`]): the credential stays plain
//!   JSON-LD; salts and the commitment live in `proof`.
//!
//! ## Operations
//!
//! - [`Wrapper::wrap_document`] / [`Wrapper::wrap_documents`] validate raw
//!   documents and seal them under one Merkle root.
//! - [`obfuscate`] redacts fields while keeping the signature valid.
//! - [`verify_signature`] recomputes the target hash and checks the path
//!   to the Merkle root.
//! - The accessors in [`accessors`] read the same facts from either format.
//!
//! ## Crate Policy
//!
//! - Documents are recognized by shape ([`Document::recognize`]), never by
//!   a version tag; an unrecognized shape is always an error.
//! - Every operation returns a new document; inputs are never mutated.
//! - A failed verification is `Ok(false)`. `Err` is reserved for documents
//!   whose shape cannot be read at all.

pub mod accessors;
pub mod error;
pub mod flat_salt;
pub mod guard;
pub mod obfuscate;
pub mod proof_object;
pub mod verify;
pub mod wrap;

pub use accessors::{
    get_asset_id, get_document_data, get_issuer_address, get_issuer_addresses, get_merkle_root,
    get_obfuscated_data, get_target_hash, get_template_url, is_document_revokable, is_obfuscated,
    is_transferable_asset,
};
pub use error::{DocumentError, WrapError};
pub use flat_salt::Signature;
pub use guard::{Document, FormatVariant};
pub use obfuscate::obfuscate;
pub use proof_object::MerkleProof;
pub use verify::verify_signature;
pub use wrap::Wrapper;
