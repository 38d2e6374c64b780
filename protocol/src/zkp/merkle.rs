//! # Commitment Merkle Tree
//!
//! A fixed-depth binary Poseidon tree over the ordered commitment ledger.
//! Its root is the spend's `anchor`: the circuit proves the consumed coin's
//! commitment is a leaf under that root without saying which one.
//!
//! Unused leaves are zero. Empty subtrees are filled with precomputed
//! "zero hashes", so a ledger of `n` commitments costs `O(n)` hashes to build
//! regardless of the tree depth.

use ark_bn254::Fr;
use ark_ff::Zero;
use thiserror::Error;

use crate::crypto::poseidon::{hash_with_domain, HashDomain};

/// Deepest tree we are willing to build. The circuit grows linearly with
/// depth, so anything larger is a configuration mistake.
pub const MAX_TREE_DEPTH: usize = 32;

/// Errors from building a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    /// Depth above [`MAX_TREE_DEPTH`].
    #[error("tree depth {0} exceeds the maximum of {MAX_TREE_DEPTH}")]
    DepthTooLarge(usize),

    /// More leaves than a tree of this depth can hold.
    #[error("{leaves} leaves do not fit in a tree of depth {depth}")]
    TooManyLeaves {
        /// Number of leaves supplied.
        leaves: usize,
        /// Tree depth.
        depth: usize,
    },
}

/// `H_node(left, right)`.
pub fn node_hash(left: &Fr, right: &Fr) -> Fr {
    hash_with_domain(HashDomain::MerkleNode, &[*left, *right])
}

/// Roots of all-empty subtrees, indexed by height. `zero_hashes(d)[0]` is the
/// empty leaf, `zero_hashes(d)[d]` the root of an empty tree of depth `d`.
pub fn zero_hashes(depth: usize) -> Vec<Fr> {
    let mut zeros = Vec::with_capacity(depth + 1);
    zeros.push(Fr::zero());
    for level in 0..depth {
        let below = zeros[level];
        zeros.push(node_hash(&below, &below));
    }
    zeros
}

/// Authentication path from a leaf to the root.
///
/// `is_right[i]` is true when the node at height `i` on the path is the right
/// child of its parent, i.e. the sibling sits on the left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    /// Sibling hashes, leaf level first.
    pub siblings: Vec<Fr>,
    /// Position bits, leaf level first.
    pub is_right: Vec<bool>,
}

impl MerklePath {
    /// Number of levels in the path.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Hash `leaf` up the path.
    pub fn root_from_leaf(&self, leaf: &Fr) -> Fr {
        self.siblings
            .iter()
            .zip(&self.is_right)
            .fold(*leaf, |current, (sibling, &is_right)| {
                if is_right {
                    node_hash(sibling, &current)
                } else {
                    node_hash(&current, sibling)
                }
            })
    }
}

/// A fully materialized tree over a list of leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    depth: usize,
    /// `levels[0]` are the leaves; each next level is half as long. Missing
    /// right children are the zero hash of that level.
    levels: Vec<Vec<Fr>>,
    zeros: Vec<Fr>,
}

impl MerkleTree {
    /// Build a tree of the given depth over `leaves`, in order.
    pub fn new(depth: usize, leaves: &[Fr]) -> Result<Self, MerkleError> {
        if depth > MAX_TREE_DEPTH {
            return Err(MerkleError::DepthTooLarge(depth));
        }
        if leaves.len() > (1usize << depth) {
            return Err(MerkleError::TooManyLeaves {
                leaves: leaves.len(),
                depth,
            });
        }

        let zeros = zero_hashes(depth);
        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(leaves.to_vec());

        for level in 0..depth {
            let next: Vec<Fr> = levels[level]
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(zeros[level]);
                    node_hash(&pair[0], &right)
                })
                .collect();
            levels.push(next);
        }

        Ok(Self {
            depth,
            levels,
            zeros,
        })
    }

    /// Tree depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of occupied leaves.
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// True if no leaf is occupied.
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// The root. An empty tree has the all-zero-subtree root.
    pub fn root(&self) -> Fr {
        self.levels[self.depth]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.depth])
    }

    /// Authentication path for the leaf at `index`, if occupied.
    pub fn path(&self, index: usize) -> Option<MerklePath> {
        if index >= self.len() {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut is_right = Vec::with_capacity(self.depth);
        let mut idx = index;

        for level in 0..self.depth {
            let sibling = self.levels[level]
                .get(idx ^ 1)
                .copied()
                .unwrap_or(self.zeros[level]);
            siblings.push(sibling);
            is_right.push(idx & 1 == 1);
            idx >>= 1;
        }

        Some(MerklePath { siblings, is_right })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u64) -> Vec<Fr> {
        (1..=n).map(Fr::from).collect()
    }

    #[test]
    fn empty_tree_root_is_zero_subtree() {
        let tree = MerkleTree::new(4, &[]).unwrap();
        assert_eq!(tree.root(), zero_hashes(4)[4]);
        assert!(tree.is_empty());
        assert!(tree.path(0).is_none());
    }

    #[test]
    fn two_leaf_root_by_hand() {
        let tree = MerkleTree::new(1, &leaves(2)).unwrap();
        assert_eq!(tree.root(), node_hash(&Fr::from(1u64), &Fr::from(2u64)));
    }

    #[test]
    fn every_path_reaches_the_root() {
        let ls = leaves(11);
        let tree = MerkleTree::new(5, &ls).unwrap();
        for (i, leaf) in ls.iter().enumerate() {
            let path = tree.path(i).unwrap();
            assert_eq!(path.depth(), 5);
            assert_eq!(path.root_from_leaf(leaf), tree.root(), "leaf {i}");
        }
    }

    #[test]
    fn wrong_leaf_misses_the_root() {
        let tree = MerkleTree::new(3, &leaves(5)).unwrap();
        let path = tree.path(2).unwrap();
        assert_ne!(path.root_from_leaf(&Fr::from(999u64)), tree.root());
    }

    #[test]
    fn appending_changes_the_root() {
        let a = MerkleTree::new(4, &leaves(3)).unwrap();
        let b = MerkleTree::new(4, &leaves(4)).unwrap();
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn capacity_is_enforced() {
        assert_eq!(
            MerkleTree::new(2, &leaves(5)).unwrap_err(),
            MerkleError::TooManyLeaves { leaves: 5, depth: 2 }
        );
        assert!(MerkleTree::new(2, &leaves(4)).is_ok());
        assert_eq!(
            MerkleTree::new(MAX_TREE_DEPTH + 1, &[]).unwrap_err(),
            MerkleError::DepthTooLarge(MAX_TREE_DEPTH + 1)
        );
    }
}
