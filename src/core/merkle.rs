//! Merkle root over transaction ids
//!
//! Leaves are transaction ids in block order. Each level hashes the
//! concatenation of adjacent pairs; an unpaired last node is paired with
//! itself. A single leaf is therefore hashed with itself, and an empty list
//! has the empty root.

use crate::utils::digest_to_id;

pub struct MerkleTree;

impl MerkleTree {
    /// Calculate the Merkle root for an ordered list of ids
    pub fn calculate_merkle_root<S: AsRef<str>>(ids: &[S]) -> String {
        if ids.is_empty() {
            return String::new();
        }

        let mut current_level: Vec<String> =
            ids.iter().map(|id| id.as_ref().to_string()).collect();

        loop {
            let next_level: Vec<String> = current_level
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    Self::hash_pair(left, right)
                })
                .collect();

            if next_level.len() == 1 {
                return next_level.into_iter().next().unwrap_or_default();
            }
            current_level = next_level;
        }
    }

    fn hash_pair(left: &str, right: &str) -> String {
        let mut combined = String::with_capacity(left.len() + right.len());
        combined.push_str(left);
        combined.push_str(right);
        digest_to_id(combined.as_bytes())
    }
}
