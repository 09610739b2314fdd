//! Derived views over raw Bitcoin byte structures

use serde::{Deserialize, Serialize};

use crate::pow::U256;

/// Hash type: 256-bit digest
pub type Hash = [u8; 32];

/// 160-bit digest (RIPEMD160(SHA256(x)))
pub type Hash160 = [u8; 20];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Decoded compact-size integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarInt {
    pub value: u64,
    /// Bytes the encoding occupies on the wire (1, 3, 5 or 9)
    pub data_length: u8,
}

impl VarInt {
    /// Encoded width as an offset increment
    pub fn width(&self) -> usize {
        self.data_length as usize
    }
}

/// Input classification by scriptSig shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    /// Non-empty scriptSig spending a legacy output
    Legacy { script_sig: ByteString },
    /// P2SH-wrapped witness program; carries the pushed redeem script
    Compatibility { redeem_script: ByteString },
    /// Native witness spend (empty scriptSig)
    Witness,
}

/// A parsed transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInput {
    pub sequence: u32,
    /// Outpoint txid in wire (little-endian) order
    pub outpoint_tx_id: Hash,
    pub outpoint_index: u32,
    pub input_type: InputType,
}

/// Output classification; each variant carries only its own payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputType {
    /// Pay to witness pubkey hash
    Wpkh(Hash160),
    /// Pay to witness script hash
    Wsh(Hash),
    /// Pay to pubkey hash
    Pkh(Hash160),
    /// Pay to script hash
    Sh(Hash160),
    /// Data carrier; the pushed bytes
    OpReturn(ByteString),
    /// Anything else (only produced by permissive scans)
    Nonstandard,
}

impl OutputType {
    /// The script-specific hash or pushed data
    pub fn payload(&self) -> &[u8] {
        match self {
            OutputType::Wpkh(h) | OutputType::Pkh(h) | OutputType::Sh(h) => h,
            OutputType::Wsh(h) => h,
            OutputType::OpReturn(data) => data,
            OutputType::Nonstandard => &[],
        }
    }
}

/// A parsed transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOutput {
    /// Value in satoshis
    pub value: u64,
    pub output_type: OutputType,
}

/// Block Header decoded from its 80-byte wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// hash256 of the header, byte-reversed (display order)
    pub digest: Hash,
    pub version: u32,
    pub prev_hash_le: Hash,
    pub merkle_root_le: Hash,
    pub timestamp: u32,
    /// Compact target as it appears on the wire
    pub bits: u32,
    /// Expanded 256-bit target
    pub target: U256,
    pub nonce: u32,
}

/// BIP143 signature hash with advisory mutability flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SighashResult {
    pub digest: Hash,
    pub sighash_flag: u8,
    /// nLocktime might still be enforced
    pub possible_absolute_lock: bool,
    /// Some input might carry an enforceable BIP68 relative lock
    pub possible_relative_lock: bool,
    /// Outputs not covered by the signature may be changed
    pub updateable_outputs: bool,
    /// Inputs other than the signed one may be changed
    pub updateable_inputs: bool,
}
