//! # Error Types
//!
//! Leaf-level errors shared by every crate in the workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Higher crates wrap these (`SaltError`, `DocumentError`, `WrapError`)
//! rather than stringifying them, so callers can always match on the
//! original failure kind.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error decoding a digest from its hex interchange form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The hex string did not have exactly 64 characters.
    #[error("expected 64 hex chars, got {0}")]
    InvalidLength(usize),

    /// The string contained a non-hex character.
    #[error("invalid hex at byte {index}: {reason}")]
    InvalidHex {
        /// Byte offset of the offending pair.
        index: usize,
        /// Parser message.
        reason: String,
    },
}

/// Error combining digests into a root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombinationError {
    /// `reduce` was called with no digests. There is no meaningful root
    /// for an empty set, so none is invented.
    #[error("cannot combine an empty digest set")]
    Empty,
}

/// Error parsing a field path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string does not follow the `a.b[0].c` grammar.
    #[error("malformed field path '{path}': {reason}")]
    Malformed {
        /// The offending input.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}
