//! # oa-crypto — Salting and Hash Combination
//!
//! The correctness-critical core of document wrapping:
//!
//! - **Salter** (`salt.rs`): attaches a unique CSPRNG salt to every
//!   leaf (scalar or empty container) so a leaf digest never reveals its
//!   value without the salt.
//! - **SHA-256** (`sha256.rs`): digests computed from `CanonicalBytes` or,
//!   for node combination, from two concatenated digests.
//! - **Hash Combiner** (`merkle.rs`): leaf digests, commutative pairwise
//!   combination, order-independent `reduce`, and the batch Merkle tree that
//!   yields per-document proof paths.
//!
//! ## Crate Policy
//!
//! - Depends only on `oa-core` internally.
//! - Salts come from `OsRng` only. A seeded or non-cryptographic generator
//!   would make salted digests linkable.
//! - No mocking of hashing in tests: real canonical bytes, real SHA-256.

pub mod merkle;
pub mod salt;
pub mod sha256;

pub use merkle::{combine, combine_optional, leaf_digest, reduce, verify_proof, MerkleTree};
pub use salt::{
    is_leaf, redaction_gaps, salt_data, salted_leaves, unsalt_data, PathSalt, Salt, SaltError,
    SaltedValue, Salter,
};
pub use sha256::{sha256_digest, sha256_pair};
