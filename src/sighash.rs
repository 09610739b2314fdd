//! BIP143 signature hash for witness inputs
//!
//! Preimage layout:
//! ```text
//! version LE4 | hashPrevouts | hashSequence | outpoint | varint(scriptCode) | scriptCode
//!   | value LE8 | nSequence LE4 | hashOutputs | nLocktime LE4 | sighash type LE4
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::constants::*;
use crate::error::{Result, SpvError};
use crate::hash::{hash160, hash256};
use crate::input::split_vin;
use crate::output::split_vout;
use crate::pow::U256;
use crate::transaction::{extract_locktime, extract_version, extract_vin, extract_vout};
use crate::types::{Hash, SighashResult};
use crate::varint::write_var_int;

const ZERO_HASH: Hash = [0u8; 32];

/// Sighash type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SighashFlag(pub u8);

impl SighashFlag {
    pub const ALL: SighashFlag = SighashFlag(SIGHASH_ALL);
    pub const NONE: SighashFlag = SighashFlag(SIGHASH_NONE);
    pub const SINGLE: SighashFlag = SighashFlag(SIGHASH_SINGLE);
    pub const ALL_ANYONECANPAY: SighashFlag = SighashFlag(SIGHASH_ALL | SIGHASH_ANYONECANPAY);
    pub const NONE_ANYONECANPAY: SighashFlag = SighashFlag(SIGHASH_NONE | SIGHASH_ANYONECANPAY);
    pub const SINGLE_ANYONECANPAY: SighashFlag = SighashFlag(SIGHASH_SINGLE | SIGHASH_ANYONECANPAY);

    /// Low five bits, as consensus code masks them
    pub fn base_type(&self) -> u8 {
        self.0 & 0x1f
    }

    pub fn anyone_can_pay(&self) -> bool {
        self.0 & SIGHASH_ANYONECANPAY != 0
    }

    fn is_none(&self) -> bool {
        self.base_type() == SIGHASH_NONE
    }

    fn is_single(&self) -> bool {
        self.base_type() == SIGHASH_SINGLE
    }
}

impl From<u8> for SighashFlag {
    fn from(flag: u8) -> Self {
        SighashFlag(flag)
    }
}

/// scriptCode of a P2WPKH spend: `76 a9 14 <hash160(pubkey)> 88 ac`
pub fn p2wpkh_script_code(pubkey: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 0x14]);
    script.extend_from_slice(&hash160(pubkey));
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

fn hash_all<'a>(parts: impl Iterator<Item = &'a [u8]>) -> Hash {
    let mut buf = Vec::new();
    for part in parts {
        buf.extend_from_slice(part);
    }
    hash256(&buf)
}

fn sequence_of(input: &[u8]) -> u32 {
    let mut le = [0u8; 4];
    le.copy_from_slice(&input[input.len() - 4..]);
    u32::from_le_bytes(le)
}

/// The parts of a transaction a BIP143 preimage draws on
pub(crate) struct SigningTx<'a> {
    pub version: u32,
    pub inputs: Vec<&'a [u8]>,
    pub outputs: Vec<&'a [u8]>,
    pub locktime: u32,
}

impl<'a> SigningTx<'a> {
    pub fn parse(tx: &'a [u8]) -> Result<Self> {
        Ok(SigningTx {
            version: extract_version(tx)?,
            inputs: split_vin(extract_vin(tx)?)?,
            outputs: split_vout(extract_vout(tx)?)?,
            locktime: extract_locktime(tx)?,
        })
    }
}

/// BIP143 preimage fields, in serialization order
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Bip143Preimage<'a> {
    pub version: u32,
    pub hash_prevouts: Hash,
    pub hash_sequence: Hash,
    pub outpoint: &'a [u8],
    pub script_code: &'a [u8],
    pub value: u64,
    pub sequence: u32,
    pub hash_outputs: Hash,
    pub locktime: u32,
    pub sighash_type: u32,
}

impl Bip143Preimage<'_> {
    pub fn serialize(&self) -> Vec<u8> {
        let mut preimage = Vec::with_capacity(156 + self.script_code.len());
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(&self.hash_prevouts);
        preimage.extend_from_slice(&self.hash_sequence);
        preimage.extend_from_slice(self.outpoint);
        write_var_int(&mut preimage, self.script_code.len() as u64);
        preimage.extend_from_slice(self.script_code);
        preimage.extend_from_slice(&self.value.to_le_bytes());
        preimage.extend_from_slice(&self.sequence.to_le_bytes());
        preimage.extend_from_slice(&self.hash_outputs);
        preimage.extend_from_slice(&self.locktime.to_le_bytes());
        preimage.extend_from_slice(&self.sighash_type.to_le_bytes());
        preimage
    }
}

/// Bip143Preimage: tx × index × flag × scriptCode × value → preimage fields
///
/// 1. hashPrevouts is zero under ANYONECANPAY
/// 2. hashSequence is zero under ANYONECANPAY, NONE or SINGLE
/// 3. hashOutputs covers every output, only the output at `input_index` under
///    SINGLE, and is zero under NONE or SINGLE without a matching output
pub(crate) fn bip143_preimage<'a>(
    tx: &SigningTx<'a>,
    input_index: usize,
    flag: SighashFlag,
    script_code: &'a [u8],
    value: u64,
) -> Result<Bip143Preimage<'a>> {
    let input = *tx.inputs.get(input_index).ok_or_else(|| {
        debug!(input_index, count = tx.inputs.len(), "sighash input index out of range");
        SpvError::InputIndexOutOfRange {
            index: input_index,
            count: tx.inputs.len(),
        }
    })?;

    let hash_prevouts = if flag.anyone_can_pay() {
        ZERO_HASH
    } else {
        hash_all(tx.inputs.iter().map(|input| &input[..OUTPOINT_SIZE]))
    };

    let hash_sequence = if flag.anyone_can_pay() || flag.is_none() || flag.is_single() {
        ZERO_HASH
    } else {
        hash_all(tx.inputs.iter().map(|input| &input[input.len() - 4..]))
    };

    let hash_outputs = if !flag.is_none() && !flag.is_single() {
        hash_all(tx.outputs.iter().copied())
    } else if flag.is_single() && input_index < tx.outputs.len() {
        hash256(tx.outputs[input_index])
    } else {
        ZERO_HASH
    };

    trace!(
        hash_prevouts = %U256::from_be_bytes(&hash_prevouts),
        hash_sequence = %U256::from_be_bytes(&hash_sequence),
        hash_outputs = %U256::from_be_bytes(&hash_outputs),
        "bip143 components"
    );

    Ok(Bip143Preimage {
        version: tx.version,
        hash_prevouts,
        hash_sequence,
        outpoint: &input[..OUTPOINT_SIZE],
        script_code,
        value,
        sequence: sequence_of(input),
        hash_outputs,
        locktime: tx.locktime,
        sighash_type: flag.0 as u32,
    })
}

/// Bip143Sighash: tx × index × flag × scriptCode × value → SighashResult
///
/// `script_code` is passed without its length prefix. The lock flags are
/// advisory only:
/// - `possible_absolute_lock` is false only when every sequence is final and
///   nLocktime is 0. A non-zero nLocktime with all-final sequences is reported
///   as possibly locked; nLocktime is never compared against a height or time.
/// - `possible_relative_lock` requires version >= 2 and a sequence with the disable bit clear
pub fn bip143_sighash(
    tx: &[u8],
    input_index: usize,
    flag: SighashFlag,
    script_code: &[u8],
    value: u64,
) -> Result<SighashResult> {
    let signing = SigningTx::parse(tx)?;
    let preimage = bip143_preimage(&signing, input_index, flag, script_code, value)?;

    let digest = hash256(&preimage.serialize());
    trace!(input_index, flag = flag.0, digest = %U256::from_be_bytes(&digest), "bip143 digest");

    let sequences: Vec<u32> = signing.inputs.iter().map(|input| sequence_of(input)).collect();
    let all_final = sequences.iter().all(|&seq| seq == SEQUENCE_FINAL);
    let possible_relative_lock = signing.version >= 2
        && sequences.iter().any(|&seq| seq & SEQUENCE_LOCKTIME_DISABLE_FLAG == 0);

    Ok(SighashResult {
        digest,
        sighash_flag: flag.0,
        possible_absolute_lock: !(all_final && signing.locktime == 0),
        possible_relative_lock,
        updateable_outputs: flag.is_none() || flag.is_single(),
        updateable_inputs: flag.anyone_can_pay(),
    })
}
