use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use weft_types::{ContentHash, RecordPath};

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Binary Merkle tree over an account's record set.
///
/// This is the tree behind every commit's root hash, so its shape is part
/// of the wire contract and must be stable across implementations:
///
/// 1. Leaves are `H("weft-mst-v1" ":leaf:" collection 0x00 rkey 0x00 content_hash)`,
///    ordered lexicographically by `(collection, rkey)`.
/// 2. Internal levels pair adjacent nodes left-to-right as
///    `H("weft-mst-v1" ":node:" left right)`; an odd trailing node is
///    hashed with itself.
/// 3. The empty set has the null root; a single leaf is its own root.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// The root hash of the tree.
    root: ContentHash,
    /// Original leaf hashes.
    leaves: Vec<ContentHash>,
    /// All tree nodes (leaves + internal), stored level by level.
    /// Level 0 = leaves, last element = root.
    levels: Vec<Vec<ContentHash>>,
}

impl MerkleTree {
    /// Build a Merkle tree from pre-computed leaf hashes.
    pub fn from_leaves(leaves: Vec<ContentHash>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: ContentHash::null(),
                leaves: vec![],
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<ContentHash>> = vec![leaves.clone()];
        let mut current = leaves.clone();

        while current.len() > 1 {
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                let hash = if pair.len() == 2 {
                    hash_pair(&pair[0], &pair[1])
                } else {
                    // Odd node: hash with itself
                    hash_pair(&pair[0], &pair[0])
                };
                next.push(hash);
            }
            levels.push(next.clone());
            current = next;
        }

        let root = current[0];
        Self {
            root,
            leaves,
            levels,
        }
    }

    /// Build the tree for a record set (path → content hash).
    ///
    /// The `BTreeMap` supplies the canonical `(collection, rkey)` ordering.
    pub fn from_records(records: &BTreeMap<RecordPath, ContentHash>) -> Self {
        let leaves = records
            .iter()
            .map(|(path, hash)| leaf_for_record(path, hash))
            .collect();
        Self::from_leaves(leaves)
    }

    /// The root hash of the tree.
    pub fn root(&self) -> ContentHash {
        self.root
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaves.len() || self.levels.is_empty() {
            return None;
        }

        let mut path = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = if sibling_idx < level.len() {
                level[sibling_idx]
            } else {
                // Odd level: duplicate the last element
                level[idx]
            };
            let side = if idx % 2 == 0 {
                Side::Right
            } else {
                Side::Left
            };
            path.push((sibling, side));
            idx /= 2;
        }

        Some(MerkleProof {
            leaf: self.leaves[index],
            path,
            root: self.root,
        })
    }
}

/// Merkle inclusion proof.
///
/// Lets a federation consumer check that a single record is part of a
/// commit's root without downloading the full repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: ContentHash,
    /// Path of (sibling_hash, sibling_side) pairs from leaf to root.
    pub path: Vec<(ContentHash, Side)>,
    /// Expected root hash.
    pub root: ContentHash,
}

impl MerkleProof {
    /// Verify the proof: recompute the root from the leaf and path.
    pub fn verify(&self) -> bool {
        let mut current = self.leaf;
        for (sibling, side) in &self.path {
            current = match side {
                Side::Left => hash_pair(sibling, &current),
                Side::Right => hash_pair(&current, sibling),
            };
        }
        current == self.root
    }
}

/// Leaf hash for a single record entry.
pub fn leaf_for_record(path: &RecordPath, content_hash: &ContentHash) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"weft-mst-v1:leaf:");
    hasher.update(path.collection.as_bytes());
    hasher.update(&[0u8]);
    hasher.update(path.rkey.as_bytes());
    hasher.update(&[0u8]);
    hasher.update(content_hash.as_bytes());
    ContentHash::from_hash(*hasher.finalize().as_bytes())
}

/// Root hash for a full record set. Convenience over [`MerkleTree::from_records`].
pub fn root_for_records(records: &BTreeMap<RecordPath, ContentHash>) -> ContentHash {
    MerkleTree::from_records(records).root()
}

fn hash_pair(left: &ContentHash, right: &ContentHash) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"weft-mst-v1:node:");
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    ContentHash::from_hash(*hasher.finalize().as_bytes())
}
