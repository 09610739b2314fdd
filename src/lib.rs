//! # SPV-Proof
//!
//! Simplified Payment Verification primitives over raw Bitcoin bytes.
//!
//! This crate provides pure, side-effect-free functions that let a light
//! client, relay or bridge trust a handful of header digests and re-derive
//! everything else from raw bytes plus proofs.
//!
//! ## Components
//!
//! - `varint`: CompactSize decoding with explicit widths
//! - `transaction`, `input`, `output`: segwit transaction parsing and
//!   script classification by offset re-slicing
//! - `merkle`: inclusion proof verification
//! - `header`, `pow`: 80-byte header decoding, compact targets, difficulty
//! - `chain`: header chain linkage and work validation
//! - `sighash`: BIP143 signature hash preimages
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: no shared state, no I/O, every call is independent
//! 2. **Typed Failures**: malformed input is an `SpvError`, never a panic
//! 3. **Fail Closed**: boolean verifiers return `false` for anything unproven
//! 4. **Exact Version Pinning**: hash dependencies are pinned to exact versions
//!
//! ## Usage
//!
//! ```rust
//! use spv_proof::SpvProof;
//!
//! let spv = SpvProof::new();
//! let txid = [7u8; 32];
//! // A block with one transaction has that transaction's id as its Merkle root
//! assert!(spv.prove_inclusion(&txid, &txid, &[], 0));
//! ```

pub mod types;
pub mod constants;
pub mod config;
pub mod error;
pub mod hash;
pub mod varint;
pub mod transaction;
pub mod output;
pub mod input;
pub mod merkle;
pub mod pow;
pub mod header;
pub mod chain;
pub mod sighash;

// Re-export commonly used types
pub use types::*;
pub use chain::ChainOptions;
pub use config::{OutputPolicy, SpvConfig};
pub use error::{Result, SpvError};
pub use pow::U256;
pub use sighash::SighashFlag;

/// Main SPV verification entry point
///
/// Carries an `SpvConfig` and applies it to the free functions in each
/// module: output policy, header chain bounds, difficulty-1 target and
/// retarget period.
///
/// # Examples
///
/// ```
/// use spv_proof::{OutputPolicy, SpvConfig, SpvProof};
///
/// let config = SpvConfig {
///     output_policy: OutputPolicy::Permissive,
///     ..SpvConfig::default()
/// };
/// let spv = SpvProof::with_config(config).unwrap();
/// assert_eq!(spv.config().output_policy, OutputPolicy::Permissive);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpvProof {
    config: SpvConfig,
}

impl SpvProof {
    /// Create an instance with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an instance with a validated configuration
    pub fn with_config(config: SpvConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SpvConfig {
        &self.config
    }

    /// Classify a single raw output according to the configured policy
    pub fn classify_output(&self, output: &[u8]) -> Result<ParsedOutput> {
        match self.config.output_policy {
            OutputPolicy::Strict => output::parse_output(output),
            OutputPolicy::Permissive => output::scan_output(output),
        }
    }

    /// Parse the output at `index` of a raw segwit transaction
    pub fn parse_transaction_output(&self, tx: &[u8], index: usize) -> Result<ParsedOutput> {
        self.classify_output(transaction::extract_output_at_index(tx, index)?)
    }

    /// Parse every output of a raw segwit transaction
    pub fn parse_transaction_outputs(&self, tx: &[u8]) -> Result<Vec<ParsedOutput>> {
        output::split_vout(transaction::extract_vout(tx)?)?
            .into_iter()
            .map(|raw| self.classify_output(raw))
            .collect()
    }

    /// Parse the input at `index` of a raw segwit transaction
    pub fn parse_transaction_input(&self, tx: &[u8], index: usize) -> Result<ParsedInput> {
        input::parse_input(transaction::extract_input_at_index(tx, index)?)
    }

    /// Transaction id in wire (little-endian) order
    pub fn transaction_id(&self, tx: &[u8]) -> Result<Hash> {
        transaction::transaction_hash(tx)
    }

    /// Verify a Merkle inclusion proof against a known root
    pub fn prove_inclusion(&self, tx_id_le: &Hash, merkle_root_le: &Hash, intermediate_nodes: &[u8], index: u64) -> bool {
        merkle::prove(tx_id_le, merkle_root_le, intermediate_nodes, index)
    }

    /// Verify that a transaction is committed to by a raw header's Merkle root
    ///
    /// The header must be well-formed; the proof itself fails closed.
    pub fn prove_in_header(&self, header: &[u8], tx_id_le: &Hash, intermediate_nodes: &[u8], index: u64) -> Result<bool> {
        let root = header::extract_merkle_root_le(header)?;
        Ok(merkle::prove(tx_id_le, &root, intermediate_nodes, index))
    }

    pub fn parse_header(&self, header: &[u8]) -> Result<BlockHeader> {
        header::parse_header(header)
    }

    /// Strict chain validation; returns total difficulty
    pub fn validate_header_chain(&self, headers: &[u8]) -> Result<U256> {
        chain::validate_header_chain_with(headers, &self.config.chain_options())
    }

    /// Accumulate-only chain weighing for fork choice
    pub fn accumulate_chain_difficulty(&self, headers: &[u8]) -> Result<U256> {
        chain::accumulate_chain_difficulty_with(headers, &self.config.chain_options())
    }

    /// Relative difficulty of a target against the configured difficulty-1 target
    pub fn difficulty(&self, target: &U256) -> Result<U256> {
        let difficulty_one = pow::expand_target(self.config.difficulty_one_bits)?;
        Ok(pow::calculate_difficulty_with(&difficulty_one, target))
    }

    /// Next target over the configured retarget period
    pub fn retarget(&self, previous_target: &U256, first_timestamp: u32, second_timestamp: u32) -> Result<U256> {
        pow::retarget_algorithm_with_period(
            previous_target,
            first_timestamp,
            second_timestamp,
            self.config.retarget_period_secs,
        )
    }

    /// BIP143 sighash for one input of a raw segwit transaction
    pub fn sighash(
        &self,
        tx: &[u8],
        input_index: usize,
        flag: SighashFlag,
        script_code: &[u8],
        value: u64,
    ) -> Result<SighashResult> {
        sighash::bip143_sighash(tx, input_index, flag, script_code, value)
    }
}
