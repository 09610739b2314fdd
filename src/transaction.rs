//! Segwit transaction parsing
//!
//! Only witness-serialized transactions are accepted:
//! `version LE4 (1 or 2) | 00 01 | vin | vout | witness | locktime LE4`,
//! with every input carrying an empty scriptSig and every output script
//! length encoded in a single byte. Every accessor re-walks the buffer from
//! the prefix; nothing is cached between calls.

use std::ops::Range;

use tracing::debug;

use crate::constants::*;
use crate::error::{Result, SpvError};
use crate::hash::{hash256, reversed_hash};
use crate::types::{Hash, VarInt};
use crate::varint::{determine_var_int_data_length, read_var_int};

/// Byte ranges of each section of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxLayout {
    pub num_inputs: u64,
    pub num_outputs: u64,
    /// Count-prefixed inputs
    pub vin: Range<usize>,
    /// Count-prefixed outputs
    pub vout: Range<usize>,
    pub witness: Range<usize>,
    pub locktime: Range<usize>,
}

/// ExtractPrefix: tx → version || marker || flag
///
/// A valid prefix is exactly 6 bytes:
/// 1. byte 0 is version 1 or 2
/// 2. bytes 1..6 are `00 00 00 00 01` (upper version bytes, marker, flag)
pub fn extract_prefix(tx: &[u8]) -> Result<&[u8]> {
    match tx.get(..PREFIX_SIZE) {
        Some(prefix) if matches!(prefix[0], 1 | 2) && prefix[1..] == SEGWIT_PREFIX_TAIL => Ok(prefix),
        _ => {
            debug!(len = tx.len(), "transaction lacks a version 1/2 segwit prefix");
            Err(SpvError::InvalidPrefix)
        }
    }
}

pub fn extract_version(tx: &[u8]) -> Result<u32> {
    Ok(extract_prefix(tx)?[0] as u32)
}

fn witness_input(tx: &[u8], offset: usize, index: usize) -> Result<&[u8]> {
    let script_len = *tx.get(offset + OUTPOINT_SIZE).ok_or(SpvError::MalformedVin)?;
    if script_len != 0 {
        debug!(index, script_len, "input has a non-empty scriptSig");
        return Err(SpvError::UnsupportedInputFormat(index));
    }
    tx.get(offset..offset + WITNESS_INPUT_SIZE).ok_or(SpvError::MalformedVin)
}

fn single_byte_output(tx: &[u8], offset: usize, index: usize) -> Result<&[u8]> {
    let tag = *tx.get(offset + OUTPUT_VALUE_SIZE).ok_or(SpvError::MalformedVout)?;
    if determine_var_int_data_length(tag) != 0 {
        debug!(index, tag, "output script length is not a single-byte VarInt");
        return Err(SpvError::UnsupportedOutputFormat(index));
    }
    tx.get(offset..offset + OUTPUT_VALUE_SIZE + 1 + tag as usize)
        .ok_or(SpvError::MalformedVout)
}

fn num_inputs(tx: &[u8]) -> Result<VarInt> {
    extract_prefix(tx)?;
    let count = read_var_int(tx, PREFIX_SIZE).map_err(|_| SpvError::MalformedVin)?;
    if count.value == 0 {
        debug!("transaction has no inputs");
        return Err(SpvError::MalformedVin);
    }
    Ok(count)
}

/// Walks the vin, stopping after input `last` (or the final input), returning the end offset
fn walk_vin(tx: &[u8], count: &VarInt, last: u64) -> Result<usize> {
    let mut offset = PREFIX_SIZE + count.width();
    for i in 0..=last.min(count.value - 1) {
        offset += witness_input(tx, offset, i as usize)?.len();
    }
    Ok(offset)
}

fn vin_range(tx: &[u8]) -> Result<(u64, Range<usize>)> {
    let count = num_inputs(tx)?;
    let end = walk_vin(tx, &count, u64::MAX)?;
    Ok((count.value, PREFIX_SIZE..end))
}

fn vout_range(tx: &[u8], start: usize) -> Result<(u64, Range<usize>)> {
    let count = read_var_int(tx, start).map_err(|_| SpvError::MalformedVout)?;
    if count.value == 0 {
        debug!("transaction has no outputs");
        return Err(SpvError::MalformedVout);
    }

    let mut offset = start + count.width();
    for i in 0..count.value {
        offset += single_byte_output(tx, offset, i as usize)?.len();
    }
    Ok((count.value, start..offset))
}

/// Locates every section of the transaction
pub fn tx_layout(tx: &[u8]) -> Result<TxLayout> {
    let (num_inputs, vin) = vin_range(tx)?;
    let (num_outputs, vout) = vout_range(tx, vin.end)?;

    if tx.len() < vout.end + LOCKTIME_SIZE {
        debug!(len = tx.len(), vout_end = vout.end, "no room for locktime after vout");
        return Err(SpvError::MalformedVout);
    }
    let locktime_start = tx.len() - LOCKTIME_SIZE;

    Ok(TxLayout {
        num_inputs,
        num_outputs,
        witness: vout.end..locktime_start,
        locktime: locktime_start..tx.len(),
        vin,
        vout,
    })
}

pub fn extract_num_inputs(tx: &[u8]) -> Result<u64> {
    Ok(num_inputs(tx)?.value)
}

/// Count-prefixed input section
pub fn extract_vin(tx: &[u8]) -> Result<&[u8]> {
    let (_, vin) = vin_range(tx)?;
    Ok(&tx[vin])
}

/// ExtractInputAtIndex: tx × ℕ → input
///
/// 1. The prefix must be valid
/// 2. index < |ins|, else `InputIndexOutOfRange`
/// 3. Every input up to and including `index` must have an empty scriptSig
pub fn extract_input_at_index(tx: &[u8], index: usize) -> Result<&[u8]> {
    let count = num_inputs(tx)?;
    if index as u64 >= count.value {
        return Err(SpvError::InputIndexOutOfRange {
            index,
            count: count.value as usize,
        });
    }
    let end = walk_vin(tx, &count, index as u64)?;
    Ok(&tx[end - WITNESS_INPUT_SIZE..end])
}

pub fn extract_num_outputs(tx: &[u8]) -> Result<u64> {
    let (_, vin) = vin_range(tx)?;
    Ok(read_var_int(tx, vin.end).map_err(|_| SpvError::MalformedVout)?.value)
}

/// Count-prefixed output section
pub fn extract_vout(tx: &[u8]) -> Result<&[u8]> {
    let (_, vin) = vin_range(tx)?;
    let (_, vout) = vout_range(tx, vin.end)?;
    Ok(&tx[vout])
}

/// ExtractOutputAtIndex: tx × ℕ → output
///
/// 1. The vin must walk cleanly
/// 2. index < |outs|, else `OutputIndexOutOfRange`
/// 3. Every output up to and including `index` must use a single-byte script length
pub fn extract_output_at_index(tx: &[u8], index: usize) -> Result<&[u8]> {
    let (_, vin) = vin_range(tx)?;
    let count = read_var_int(tx, vin.end).map_err(|_| SpvError::MalformedVout)?;
    if index as u64 >= count.value {
        return Err(SpvError::OutputIndexOutOfRange {
            index,
            count: count.value as usize,
        });
    }

    let mut offset = vin.end + count.width();
    for i in 0..index {
        offset += single_byte_output(tx, offset, i)?.len();
    }
    single_byte_output(tx, offset, index)
}

/// Raw witness section between the vout and the locktime
pub fn extract_witness(tx: &[u8]) -> Result<&[u8]> {
    let layout = tx_layout(tx)?;
    Ok(&tx[layout.witness])
}

pub fn extract_locktime(tx: &[u8]) -> Result<u32> {
    let layout = tx_layout(tx)?;
    let mut le = [0u8; 4];
    le.copy_from_slice(&tx[layout.locktime]);
    Ok(u32::from_le_bytes(le))
}

/// CalculateTxId: hash256(version || vin || vout || locktime), wire order
///
/// The segwit marker, flag and witness are not committed to.
pub fn calculate_tx_id(version: &[u8], vin: &[u8], vout: &[u8], locktime: &[u8]) -> Hash {
    let mut preimage = Vec::with_capacity(version.len() + vin.len() + vout.len() + locktime.len());
    preimage.extend_from_slice(version);
    preimage.extend_from_slice(vin);
    preimage.extend_from_slice(vout);
    preimage.extend_from_slice(locktime);
    hash256(&preimage)
}

/// Txid of a raw transaction in wire (little-endian) order
pub fn transaction_hash(tx: &[u8]) -> Result<Hash> {
    let layout = tx_layout(tx)?;
    Ok(calculate_tx_id(
        &tx[..4],
        &tx[layout.vin],
        &tx[layout.vout],
        &tx[layout.locktime],
    ))
}

/// Txid in display (big-endian) order
pub fn tx_id_be(tx: &[u8]) -> Result<Hash> {
    Ok(reversed_hash(&transaction_hash(tx)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX: &str = "01000000000102fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa8e47ecb8ae4bf38b7cae4e8d3e0c8c8c9e90100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac000011000000";

    fn tx() -> Vec<u8> {
        hex::decode(TX).unwrap()
    }

    #[test]
    fn test_layout() {
        let layout = tx_layout(&tx()).unwrap();
        assert_eq!(layout.num_inputs, 2);
        assert_eq!(layout.num_outputs, 2);
        assert_eq!(layout.vin, 6..89);
        assert_eq!(layout.vout, 89..158);
        assert_eq!(layout.witness, 158..160);
        assert_eq!(layout.locktime, 160..164);
    }

    #[test]
    fn test_accessors() {
        let tx = tx();
        assert_eq!(extract_prefix(&tx).unwrap(), &tx[..6]);
        assert_eq!(extract_version(&tx).unwrap(), 1);
        assert_eq!(extract_num_inputs(&tx).unwrap(), 2);
        assert_eq!(extract_num_outputs(&tx).unwrap(), 2);
        assert_eq!(extract_locktime(&tx).unwrap(), 17);
        assert_eq!(extract_witness(&tx).unwrap(), &[0u8, 0u8]);
        assert_eq!(extract_vin(&tx).unwrap(), &tx[6..89]);
        assert_eq!(extract_vout(&tx).unwrap(), &tx[89..158]);

        assert_eq!(extract_input_at_index(&tx, 0).unwrap(), &tx[7..48]);
        assert_eq!(extract_input_at_index(&tx, 1).unwrap(), &tx[48..89]);
        assert_eq!(
            hex::encode(extract_output_at_index(&tx, 1).unwrap()),
            "9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac"
        );
    }

    #[test]
    fn test_txid() {
        let tx = tx();
        assert_eq!(
            hex::encode(tx_id_be(&tx).unwrap()),
            "4a6382088ba3f7adfc873a0839fc8938b2b0de6ecdb740cba1ccc5b791ca60d3"
        );
        let layout = tx_layout(&tx).unwrap();
        assert_eq!(
            calculate_tx_id(&tx[..4], &tx[layout.vin], &tx[layout.vout], &tx[160..]),
            transaction_hash(&tx).unwrap()
        );
    }

    #[test]
    fn test_invalid_prefix() {
        let mut tx = tx();
        tx[0] = 3;
        assert_eq!(extract_prefix(&tx), Err(SpvError::InvalidPrefix));

        let mut legacy = tx.clone();
        legacy[0] = 1;
        legacy[4] = 0x02;
        assert_eq!(transaction_hash(&legacy), Err(SpvError::InvalidPrefix));
        assert_eq!(extract_version(&[1, 0, 0]), Err(SpvError::InvalidPrefix));
    }

    #[test]
    fn test_non_empty_script_sig() {
        let mut tx = tx();
        tx[48 + 36] = 0x01;
        assert_eq!(extract_input_at_index(&tx, 0).unwrap().len(), 41);
        assert_eq!(extract_input_at_index(&tx, 1), Err(SpvError::UnsupportedInputFormat(1)));
        assert_eq!(extract_vout(&tx), Err(SpvError::UnsupportedInputFormat(1)));
    }

    #[test]
    fn test_multi_byte_script_length() {
        let mut tx = tx();
        tx[90 + 8] = 0xfd;
        assert_eq!(extract_output_at_index(&tx, 0), Err(SpvError::UnsupportedOutputFormat(0)));
        assert_eq!(tx_layout(&tx), Err(SpvError::UnsupportedOutputFormat(0)));
    }

    #[test]
    fn test_index_out_of_range() {
        let tx = tx();
        assert_eq!(
            extract_input_at_index(&tx, 2),
            Err(SpvError::InputIndexOutOfRange { index: 2, count: 2 })
        );
        assert_eq!(
            extract_output_at_index(&tx, 5),
            Err(SpvError::OutputIndexOutOfRange { index: 5, count: 2 })
        );
    }

    #[test]
    fn test_truncated() {
        let tx = tx();
        assert_eq!(extract_vin(&tx[..60]), Err(SpvError::MalformedVin));
        assert_eq!(extract_vout(&tx[..120]), Err(SpvError::MalformedVout));
        assert_eq!(extract_locktime(&tx[..160]), Err(SpvError::MalformedVout));
    }
}
