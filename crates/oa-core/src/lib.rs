//! # oa-core — Foundational Types for Tamper-Evident Documents
//!
//! This crate defines the primitives every other crate in the workspace
//! builds on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every digest over structured data is
//!    computed from `CanonicalBytes::new()` (RFC 8785 / JCS). No raw
//!    `serde_json::to_vec()` on a digest path.
//!
//! 2. **`Digest` is raw bytes internally, hex at the boundary.** A 32-byte
//!    array ordered by its bytes; it serializes as 64 lowercase hex chars
//!    without a `0x` prefix.
//!
//! 3. **`FieldPath` names leaves.** Salts, leaf digests and redactions all
//!    address fields through the same `a.b[0].c` path grammar.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `oa-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod path;
pub mod version;

pub use canonical::CanonicalBytes;
pub use digest::{Digest, DIGEST_LEN};
pub use error::{CanonicalizationError, CombinationError, DigestError, PathError};
pub use path::{FieldPath, PathSegment};
pub use version::SchemaVersion;
