//! Header chain validation
//!
//! Two entry points serve different callers:
//! - `validate_header_chain` is the strict gate: every header must link to its
//!   predecessor and meet its own target.
//! - `accumulate_chain_difficulty` only sums relative difficulty, for comparing
//!   competing chains without per-header rejection.
//!
//! Digest computation is independent per header and may run in parallel; the
//! linkage check is a sequential fold over the precomputed digests.

use tracing::{debug, trace};

use crate::constants::HEADER_SIZE;
use crate::error::{Result, SpvError};
use crate::hash::reversed_hash;
use crate::header::parse_header;
use crate::pow::{calculate_difficulty_with, expand_target, validate_header_work, U256};
use crate::types::{BlockHeader, Hash};

/// Options shared by both validation modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOptions {
    /// Maximum number of headers accepted in one call; 0 disables the bound
    pub max_headers: usize,
    /// Compact form of the difficulty-1 target
    pub difficulty_one_bits: u32,
    /// Hash headers on the rayon pool when the feature is compiled in
    pub parallel_digests: bool,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            max_headers: 0,
            difficulty_one_bits: crate::constants::DIFFICULTY_ONE_BITS,
            parallel_digests: true,
        }
    }
}

/// Splits a concatenated header chain into 80-byte headers
pub fn split_headers(headers: &[u8]) -> Result<Vec<&[u8]>> {
    if headers.len() % HEADER_SIZE != 0 {
        debug!(len = headers.len(), "header chain not a multiple of 80 bytes");
        return Err(SpvError::MisalignedHeaderChain(headers.len()));
    }
    Ok(headers.chunks_exact(HEADER_SIZE).collect())
}

fn check_count(count: usize, max: usize) -> Result<()> {
    if max != 0 && count > max {
        debug!(count, max, "header chain exceeds configured bound");
        return Err(SpvError::HeaderChainTooLong { count, max });
    }
    Ok(())
}

/// Wire-order digests of every header in the chain
pub fn header_digests(headers: &[u8]) -> Result<Vec<Hash>> {
    Ok(parse_all(&split_headers(headers)?, true)?
        .iter()
        .map(|h| reversed_hash(&h.digest))
        .collect())
}

/// Decodes (and hashes) every header, on the rayon pool when available
fn parse_all(headers: &[&[u8]], parallel: bool) -> Result<Vec<BlockHeader>> {
    #[cfg(feature = "rayon")]
    {
        if parallel {
            use rayon::prelude::*;
            return headers.par_iter().map(|h| parse_header(h)).collect();
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    headers.iter().map(|h| parse_header(h)).collect()
}

/// Linkage fold: `prev_hashes[i]` must equal `digests[i - 1]` for every `i > 0`
///
/// Both sequences are in wire (little-endian) order. The first header's
/// parent is not checked.
pub fn verify_linkage(digests: &[Hash], prev_hashes: &[Hash]) -> Result<()> {
    digests
        .iter()
        .zip(prev_hashes.iter().skip(1))
        .enumerate()
        .try_for_each(|(i, (parent, claimed))| {
            if parent == claimed {
                Ok(())
            } else {
                debug!(index = i + 1, "header does not commit to its predecessor");
                Err(SpvError::ChainLinkageBroken(i + 1))
            }
        })
}

/// Strict validation: linkage and per-header work, returning total difficulty
pub fn validate_header_chain(headers: &[u8]) -> Result<U256> {
    validate_header_chain_with(headers, &ChainOptions::default())
}

pub fn validate_header_chain_with(headers: &[u8], options: &ChainOptions) -> Result<U256> {
    let raw = split_headers(headers)?;
    check_count(raw.len(), options.max_headers)?;
    let difficulty_one = expand_target(options.difficulty_one_bits)?;

    let parsed = parse_all(&raw, options.parallel_digests)?;

    let digests: Vec<Hash> = parsed.iter().map(|h| reversed_hash(&h.digest)).collect();
    let prev_hashes: Vec<Hash> = parsed.iter().map(|h| h.prev_hash_le).collect();
    verify_linkage(&digests, &prev_hashes)?;

    let mut total = U256::zero();
    for (i, header) in parsed.iter().enumerate() {
        trace!(index = i, digest = %U256::from_be_bytes(&header.digest), "checking header work");
        if !validate_header_work(&header.digest, &header.target) {
            debug!(index = i, bits = header.bits, "header does not meet its target");
            return Err(SpvError::InsufficientWork(i));
        }
        total = total.saturating_add(&calculate_difficulty_with(&difficulty_one, &header.target));
    }

    Ok(total)
}

/// Accumulate-only mode: sums relative difficulty with no linkage or work checks
pub fn accumulate_chain_difficulty(headers: &[u8]) -> Result<U256> {
    accumulate_chain_difficulty_with(headers, &ChainOptions::default())
}

pub fn accumulate_chain_difficulty_with(headers: &[u8], options: &ChainOptions) -> Result<U256> {
    let raw = split_headers(headers)?;
    check_count(raw.len(), options.max_headers)?;
    let difficulty_one = expand_target(options.difficulty_one_bits)?;

    raw.iter().try_fold(U256::zero(), |total, header| {
        let target = crate::header::extract_target(header)?;
        Ok(total.saturating_add(&calculate_difficulty_with(&difficulty_one, &target)))
    })
}
