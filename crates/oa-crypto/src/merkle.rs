//! # Hash Combiner
//!
//! Turns a set of leaf digests into one root that commits to all of them.
//!
//! ## Algorithm
//!
//! - Leaf: `SHA256(JCS({"<path>": {"salt": s, "value": v}}))`.
//! - Pair: `SHA256(min(a, b) || max(a, b))`, ordering by raw bytes.
//! - Level: sort the whole level, combine adjacent pairs, pass an odd
//!   trailing digest through unchanged. Repeat until one digest remains.
//!
//! Because both the pair and the level are sorted, the root depends only on
//! the *set* of leaves, never on the order they were enumerated in. Redacting
//! a field replaces its leaf by the leaf's digest, so the root survives.
//!
//! ## Proofs
//!
//! [`MerkleTree`] keeps every level so that a batch of documents can each
//! carry a sibling path from their own `targetHash` to the shared
//! `merkleRoot`. Pass-through rounds contribute no step.

use oa_core::{CanonicalBytes, CanonicalizationError, CombinationError, Digest};
use serde_json::{Map, Value};

use crate::salt::SaltedValue;
use crate::sha256::{sha256_digest, sha256_pair};

/// Digest of one salted leaf at a rendered field path.
///
/// # Errors
///
/// Returns `CanonicalizationError` if the value cannot be canonicalized.
pub fn leaf_digest(path: &str, leaf: &SaltedValue) -> Result<Digest, CanonicalizationError> {
    let mut obj = Map::new();
    obj.insert(path.to_string(), serde_json::to_value(leaf)?);
    let canonical = CanonicalBytes::new(&Value::Object(obj))?;
    Ok(sha256_digest(&canonical))
}

/// Combine two digests, independent of argument order.
pub fn combine(a: &Digest, b: &Digest) -> Digest {
    if a <= b {
        sha256_pair(a, b)
    } else {
        sha256_pair(b, a)
    }
}

/// Combine two optional digests. A missing operand lets the other through.
pub fn combine_optional(a: Option<&Digest>, b: Option<&Digest>) -> Option<Digest> {
    match (a, b) {
        (Some(a), Some(b)) => Some(combine(a, b)),
        (Some(only), None) | (None, Some(only)) => Some(*only),
        (None, None) => None,
    }
}

/// Reduce a set of digests to their root.
///
/// # Errors
///
/// Returns `CombinationError::Empty` for an empty input.
pub fn reduce(digests: &[Digest]) -> Result<Digest, CombinationError> {
    Ok(MerkleTree::new(digests)?.root())
}

fn next_level(level: &[Digest]) -> Vec<Digest> {
    let mut next: Vec<Digest> = level
        .chunks(2)
        .filter_map(|pair| combine_optional(pair.first(), pair.get(1)))
        .collect();
    next.sort_unstable();
    next
}

/// A fully materialized combination tree.
///
/// Every level is stored sorted; `levels[0]` holds the leaves and the last
/// level holds exactly the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
    root: Digest,
}

impl MerkleTree {
    /// Build the tree over a set of leaf digests.
    ///
    /// # Errors
    ///
    /// Returns `CombinationError::Empty` for an empty input.
    pub fn new(leaves: &[Digest]) -> Result<Self, CombinationError> {
        if leaves.is_empty() {
            return Err(CombinationError::Empty);
        }
        let mut current = leaves.to_vec();
        current.sort_unstable();
        let mut levels = Vec::new();
        while current.len() > 1 {
            let next = next_level(&current);
            levels.push(std::mem::replace(&mut current, next));
        }
        let root = current[0];
        levels.push(current);
        Ok(Self { levels, root })
    }

    /// The root digest.
    pub fn root(&self) -> Digest {
        self.root
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Always false: an empty tree cannot be built.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sibling path from `leaf` to the root, or `None` if `leaf` is not in the tree.
    pub fn proof(&self, leaf: &Digest) -> Option<Vec<Digest>> {
        let mut current = *leaf;
        let mut path = Vec::new();
        for level in &self.levels[..self.levels.len() - 1] {
            let idx = level.binary_search(&current).ok()?;
            if let Some(sibling) = level.get(idx ^ 1) {
                path.push(*sibling);
                current = combine(&current, sibling);
            }
        }
        Some(path)
    }
}

/// Check that folding `proof` over `leaf` yields `root`.
pub fn verify_proof(leaf: &Digest, proof: &[Digest], root: &Digest) -> bool {
    proof.iter().fold(*leaf, |acc, sibling| combine(&acc, sibling)) == *root
}
