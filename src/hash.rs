//! Hash primitives and byte-order helpers

use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::types::{Hash, Hash160};

/// SHA256(SHA256(data))
pub fn hash256(data: &[u8]) -> Hash {
    let result = sha256d::Hash::hash(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// SHA256(data)
pub fn sha256(data: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(data));
    hash
}

/// RIPEMD160(data)
pub fn ripemd160(data: &[u8]) -> Hash160 {
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&Ripemd160::digest(data));
    hash
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> Hash160 {
    ripemd160(&sha256(data))
}

/// Concatenates and hashes two nodes for one Merkle level
pub fn hash256_merkle_step(a: &[u8], b: &[u8]) -> Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(a);
    engine.input(b);
    let result = sha256d::Hash::from_engine(engine);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Reverses byte order (LE <-> BE)
pub fn reverse_endianness(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Reverses a 32-byte digest
pub fn reversed_hash(hash: &Hash) -> Hash {
    let mut out = *hash;
    out.reverse();
    out
}

/// Copies a 32-byte slice into a `Hash`. Caller guarantees the length.
pub(crate) fn to_hash(bytes: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[..32]);
    hash
}
