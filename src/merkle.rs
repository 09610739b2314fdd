//! Merkle inclusion proofs
//!
//! A proof is `leaf(32) || siblings(32 * k) || root(32)` with the leaf's
//! position passed separately. Verification fails closed: any structural
//! problem means "not proven".

use tracing::debug;

use crate::constants::HASH_SIZE;
use crate::hash::{hash256_merkle_step, to_hash};
use crate::types::Hash;

/// Prove: leaf × root × siblings × index → bool
///
/// A lone transaction is its own root, so `leaf == root` with index 0 and
/// no siblings is accepted without hashing.
pub fn prove(tx_id_le: &Hash, merkle_root_le: &Hash, intermediate_nodes: &[u8], index: u64) -> bool {
    if tx_id_le == merkle_root_le && index == 0 && intermediate_nodes.is_empty() {
        return true;
    }

    let mut proof = Vec::with_capacity(intermediate_nodes.len() + 2 * HASH_SIZE);
    proof.extend_from_slice(tx_id_le);
    proof.extend_from_slice(intermediate_nodes);
    proof.extend_from_slice(merkle_root_le);
    verify_hash256_merkle(&proof, index)
}

/// Walks a concatenated `leaf || siblings || root` proof
///
/// At each level the low bit of `index` orders the pair: odd means the
/// sibling is on the left. A 32-byte proof is a root-only proof and holds
/// trivially; a 64-byte proof (leaf and root, no path) never does.
pub fn verify_hash256_merkle(proof: &[u8], index: u64) -> bool {
    let len = proof.len();
    if len == HASH_SIZE {
        return true;
    }
    if len % HASH_SIZE != 0 || len < 3 * HASH_SIZE {
        debug!(len, "merkle proof has an invalid length");
        return false;
    }

    let root = &proof[len - HASH_SIZE..];
    let siblings = &proof[HASH_SIZE..len - HASH_SIZE];
    let mut current = to_hash(&proof[..HASH_SIZE]);
    let mut idx = index;

    for sibling in siblings.chunks_exact(HASH_SIZE) {
        current = if idx & 1 == 1 {
            hash256_merkle_step(sibling, &current)
        } else {
            hash256_merkle_step(&current, sibling)
        };
        idx >>= 1;
    }

    if current.as_slice() != root {
        debug!(index, depth = siblings.len() / HASH_SIZE, "merkle path does not reach the root");
        return false;
    }
    true
}
