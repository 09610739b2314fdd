//! Input parsing and classification
//!
//! An input is `outpoint (txid LE32 | index LE4) | scriptSig VarInt | scriptSig | sequence LE4`.
//! A witness spend carries an empty scriptSig, so its input is exactly 41 bytes.

use tracing::debug;

use crate::constants::*;
use crate::error::{Result, SpvError};
use crate::hash::{reversed_hash, to_hash};
use crate::types::{Hash, InputType, ParsedInput};
use crate::varint::read_var_int;

/// scriptSig shapes of P2SH-wrapped witness programs as `(length, prefix, push width)`.
///
/// The pushed forms `<push 34> 00 20 <32>` (P2SH-P2WSH) and `<push 22> 00 14 <20>`
/// (P2SH-P2WPKH) are what appears on chain. The bare forms carry the witness
/// program directly after the scriptSig length byte (`22 00 20 ..` at offset 36).
const COMPATIBILITY_FORMS: [(usize, &[u8], usize); 4] = [
    (0x23, &[0x22, 0x00, 0x20], 1),
    (0x17, &[0x16, 0x00, 0x14], 1),
    (0x22, &[0x00, 0x20], 0),
    (0x16, &[0x00, 0x14], 0),
];

fn read_u32(input: &[u8], offset: usize) -> Result<u32> {
    let mut le = [0u8; 4];
    le.copy_from_slice(
        input
            .get(offset..offset + 4)
            .ok_or(SpvError::InvalidInputLength(input.len()))?,
    );
    Ok(u32::from_le_bytes(le))
}

/// The 36-byte outpoint (txid LE || index LE)
pub fn extract_outpoint(input: &[u8]) -> Result<&[u8]> {
    input
        .get(..OUTPOINT_SIZE)
        .ok_or(SpvError::InvalidInputLength(input.len()))
}

/// Outpoint txid in wire order
pub fn extract_input_tx_id_le(input: &[u8]) -> Result<Hash> {
    Ok(to_hash(extract_outpoint(input)?))
}

/// Outpoint txid in display order
pub fn extract_input_tx_id_be(input: &[u8]) -> Result<Hash> {
    Ok(reversed_hash(&extract_input_tx_id_le(input)?))
}

/// Index of the spent output within its transaction
pub fn extract_tx_index(input: &[u8]) -> Result<u32> {
    read_u32(input, HASH_SIZE)
}

/// Full serialized width of the input starting at `input[0]`
pub fn determine_input_length(input: &[u8]) -> Result<usize> {
    let script_len = read_var_int(input, OUTPOINT_SIZE)?;
    usize::try_from(script_len.value)
        .ok()
        .and_then(|len| len.checked_add(OUTPOINT_SIZE + script_len.width() + 4))
        .ok_or(SpvError::InvalidInputLength(input.len()))
}

/// scriptSig bytes, without the length prefix
pub fn extract_script_sig(input: &[u8]) -> Result<&[u8]> {
    let script_len = read_var_int(input, OUTPOINT_SIZE)?;
    let start = OUTPOINT_SIZE + script_len.width();
    usize::try_from(script_len.value)
        .ok()
        .and_then(|len| input.get(start..start.checked_add(len)?))
        .ok_or(SpvError::InvalidInputLength(input.len()))
}

/// Sequence of a witness input (fixed offset 37)
pub fn extract_sequence_witness(input: &[u8]) -> Result<u32> {
    read_u32(input, OUTPOINT_SIZE + 1)
}

/// Sequence of an input with a non-empty scriptSig
pub fn extract_sequence_legacy(input: &[u8]) -> Result<u32> {
    let end = determine_input_length(input)?;
    read_u32(input, end - 4)
}

/// Whether the scriptSig is non-empty
pub fn is_legacy_input(input: &[u8]) -> bool {
    input.get(OUTPOINT_SIZE).map_or(false, |&len| len != 0)
}

fn classify(input: &[u8]) -> Result<InputType> {
    if !is_legacy_input(input) {
        return Ok(InputType::Witness);
    }

    let script_sig = extract_script_sig(input)?;
    let wrapped = COMPATIBILITY_FORMS
        .iter()
        .find(|(len, prefix, _)| script_sig.len() == *len && script_sig.starts_with(prefix));
    match wrapped {
        Some(&(_, _, push)) => Ok(InputType::Compatibility {
            redeem_script: script_sig[push..].to_vec(),
        }),
        None => Ok(InputType::Legacy {
            script_sig: script_sig.to_vec(),
        }),
    }
}

/// Decodes one input and classifies it as witness, compatibility or legacy
pub fn parse_input(input: &[u8]) -> Result<ParsedInput> {
    if input.len() < WITNESS_INPUT_SIZE {
        debug!(len = input.len(), "input shorter than a witness input");
        return Err(SpvError::InvalidInputLength(input.len()));
    }

    let input_type = classify(input)?;
    let sequence = match input_type {
        InputType::Witness => extract_sequence_witness(input)?,
        _ => extract_sequence_legacy(input)?,
    };

    Ok(ParsedInput {
        sequence,
        outpoint_tx_id: extract_input_tx_id_le(input)?,
        outpoint_index: extract_tx_index(input)?,
        input_type,
    })
}

fn input_len_in_vin(rest: &[u8]) -> Result<usize> {
    let len = determine_input_length(rest).map_err(|_| SpvError::MalformedVin)?;
    if rest.len() < len {
        return Err(SpvError::MalformedVin);
    }
    Ok(len)
}

/// Input at `index` within a count-prefixed vin (legacy or witness inputs)
pub fn extract_input_at_index(vin: &[u8], index: usize) -> Result<&[u8]> {
    let count = read_var_int(vin, 0).map_err(|_| SpvError::MalformedVin)?;
    if index as u64 >= count.value {
        return Err(SpvError::InputIndexOutOfRange {
            index,
            count: count.value as usize,
        });
    }

    let mut offset = count.width();
    for _ in 0..index {
        let rest = vin.get(offset..).ok_or(SpvError::MalformedVin)?;
        offset += input_len_in_vin(rest)?;
    }
    let rest = vin.get(offset..).ok_or(SpvError::MalformedVin)?;
    let len = input_len_in_vin(rest)?;
    Ok(&rest[..len])
}

/// Splits a count-prefixed vin into its inputs
///
/// The count must be nonzero, every input fully present and nothing may trail.
pub fn split_vin(vin: &[u8]) -> Result<Vec<&[u8]>> {
    let count = read_var_int(vin, 0).map_err(|_| SpvError::MalformedVin)?;
    if count.value == 0 {
        return Err(SpvError::MalformedVin);
    }

    let mut inputs = Vec::new();
    let mut offset = count.width();
    for _ in 0..count.value {
        let rest = vin.get(offset..).ok_or(SpvError::MalformedVin)?;
        let len = input_len_in_vin(rest)?;
        inputs.push(&rest[..len]);
        offset += len;
    }

    if offset != vin.len() {
        debug!(end = offset, len = vin.len(), "trailing bytes after vin");
        return Err(SpvError::MalformedVin);
    }
    Ok(inputs)
}

pub fn validate_vin(vin: &[u8]) -> bool {
    split_vin(vin).is_ok()
}
