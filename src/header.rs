//! Block header decoding
//!
//! Layout of the 80-byte header:
//! version LE4 | prevHash LE32 | merkleRoot LE32 | timestamp LE4 | nBits LE4 | nonce LE4

use tracing::debug;

use crate::constants::HEADER_SIZE;
use crate::error::{Result, SpvError};
use crate::hash::{hash256, reversed_hash, to_hash};
use crate::pow::{calculate_difficulty, expand_target, U256};
use crate::types::{BlockHeader, Hash};

fn check_length(header: &[u8]) -> Result<()> {
    if header.len() != HEADER_SIZE {
        debug!(len = header.len(), "rejecting header of wrong length");
        return Err(SpvError::InvalidHeaderLength(header.len()));
    }
    Ok(())
}

fn read_u32(header: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&header[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

/// ParseHeader: decodes all seven logical fields of an 80-byte header
pub fn parse_header(header: &[u8]) -> Result<BlockHeader> {
    check_length(header)?;
    let bits = read_u32(header, 72);

    Ok(BlockHeader {
        digest: header_digest(header)?,
        version: read_u32(header, 0),
        prev_hash_le: to_hash(&header[4..36]),
        merkle_root_le: to_hash(&header[36..68]),
        timestamp: read_u32(header, 68),
        bits,
        target: expand_target(bits)?,
        nonce: read_u32(header, 76),
    })
}

/// Header hash in display (big-endian) order
pub fn header_digest(header: &[u8]) -> Result<Hash> {
    check_length(header)?;
    Ok(reversed_hash(&hash256(header)))
}

/// Header hash in wire (little-endian) order, as referenced by the next header's prevHash
pub fn header_digest_le(header: &[u8]) -> Result<Hash> {
    check_length(header)?;
    Ok(hash256(header))
}

pub fn extract_version(header: &[u8]) -> Result<u32> {
    check_length(header)?;
    Ok(read_u32(header, 0))
}

pub fn extract_prev_block_hash_le(header: &[u8]) -> Result<Hash> {
    check_length(header)?;
    Ok(to_hash(&header[4..36]))
}

pub fn extract_prev_block_hash_be(header: &[u8]) -> Result<Hash> {
    Ok(reversed_hash(&extract_prev_block_hash_le(header)?))
}

/// Merkle root in wire order; use with `merkle::prove`
pub fn extract_merkle_root_le(header: &[u8]) -> Result<Hash> {
    check_length(header)?;
    Ok(to_hash(&header[36..68]))
}

pub fn extract_merkle_root_be(header: &[u8]) -> Result<Hash> {
    Ok(reversed_hash(&extract_merkle_root_le(header)?))
}

/// Timestamp in unix seconds. Miners control it within consensus bounds.
pub fn extract_timestamp(header: &[u8]) -> Result<u32> {
    check_length(header)?;
    Ok(read_u32(header, 68))
}

pub fn extract_bits(header: &[u8]) -> Result<u32> {
    check_length(header)?;
    Ok(read_u32(header, 72))
}

/// Expanded 256-bit target from the header's nBits
pub fn extract_target(header: &[u8]) -> Result<U256> {
    expand_target(extract_bits(header)?)
}

/// Difficulty the header claims; does NOT verify the work
pub fn extract_difficulty(header: &[u8]) -> Result<U256> {
    Ok(calculate_difficulty(&extract_target(header)?))
}

pub fn extract_nonce(header: &[u8]) -> Result<u32> {
    check_length(header)?;
    Ok(read_u32(header, 76))
}

/// Checks that `header` commits to `prev_digest_le` as its parent
///
/// Fails closed: a malformed header is simply not linked.
pub fn validate_header_prev_hash(header: &[u8], prev_digest_le: &Hash) -> bool {
    match extract_prev_block_hash_le(header) {
        Ok(prev) => prev == *prev_digest_le,
        Err(_) => false,
    }
}
