//! # SHA-256 Digest Computation
//!
//! Two entry points, one per digest role:
//!
//! - [`sha256_digest`] hashes `CanonicalBytes` (leaf digests). The signature
//!   makes it a compile error to hash structured data that skipped
//!   canonicalization.
//! - [`sha256_pair`] hashes two digests concatenated in the given order
//!   (combined digests). Ordering of the operands is the caller's job; see
//!   `merkle::combine`.

use oa_core::{CanonicalBytes, Digest, DIGEST_LEN};
use sha2::{Digest as _, Sha256};

fn finish(hasher: Sha256) -> Digest {
    let hash = hasher.finalize();
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&hash);
    Digest::new(bytes)
}

/// Compute a SHA-256 digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    finish(hasher)
}

/// Compute `SHA256(first || second)` over raw digest bytes.
pub fn sha256_pair(first: &Digest, second: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(first.as_bytes());
    hasher.update(second.as_bytes());
    finish(hasher)
}
