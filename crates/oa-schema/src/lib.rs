//! # oa-schema — Document Validation
//!
//! Validates raw documents before they are salted and hashed.
//!
//! ## Schema Validation (`validate`)
//!
//! [`SchemaValidator`] compiles the embedded `flat-salt.schema.json` and
//! `proof-object.schema.json` (or any directory of `*.schema.json` files)
//! once, with the jsonschema crate, and reports every violation with its
//! instance path, schema path and message.
//!
//! ## JSON-LD Term Check (`jsonld`)
//!
//! Proof-object documents are JSON-LD. [`check_terms`] resolves every
//! `@context` the document names (and every context those import) through a
//! [`ContextResolver`](oa_context::ContextResolver), then reports each
//! property that no resolved context defines.
//!
//! ## Crate Policy
//!
//! - Depends only on `oa-core` and `oa-context` internally.
//! - Schema `$id` URIs match [`SchemaVersion::id`](oa_core::SchemaVersion::id)
//!   and must not change independently.
//! - Validation is a trust boundary: a failing document is returned inside
//!   the error together with the full violation list.

pub mod document;
pub mod jsonld;
pub mod validate;

pub use document::DocumentValidator;
pub use jsonld::{check_terms, resolve_contexts, undefined_terms};
pub use validate::{
    SchemaOrigin, SchemaValidationError, SchemaValidator, ValidationViolations, Violation,
};
