//! Output parsing and script classification
//!
//! An output is `value LE8 | scriptLen VarInt | script`. Classification only
//! understands the standard templates below, all of which use a single-byte
//! script length:
//!
//! | type     | script bytes                         | payload          |
//! |----------|--------------------------------------|------------------|
//! | WPKH     | `00 14 <20>`                         | `output[11..31]` |
//! | WSH      | `00 20 <32>`                         | `output[11..43]` |
//! | PKH      | `76 a9 14 <20> 88 ac`                | `output[12..32]` |
//! | SH       | `a9 14 <20> 87`                      | `output[11..31]` |
//! | OP_RETURN| `6a <push> <data>`                   | pushed data      |

use std::ops::Range;

use tracing::debug;

use crate::constants::*;
use crate::error::{Result, SpvError};
use crate::types::{OutputType, ParsedOutput, VarInt};
use crate::varint::read_var_int;

fn bytes(output: &[u8], range: Range<usize>) -> Result<&[u8]> {
    output.get(range).ok_or(SpvError::MalformedVout)
}

/// Output value in satoshis
pub fn extract_value(output: &[u8]) -> Result<u64> {
    let mut le = [0u8; 8];
    le.copy_from_slice(bytes(output, 0..OUTPUT_VALUE_SIZE)?);
    Ok(u64::from_le_bytes(le))
}

/// The script length VarInt that follows the value
pub fn extract_output_script_len(output: &[u8]) -> Result<VarInt> {
    read_var_int(output, OUTPUT_VALUE_SIZE)
}

/// Full serialized width of the output starting at `output[0]`
pub fn determine_output_length(output: &[u8]) -> Result<usize> {
    let script_len = extract_output_script_len(output)?;
    usize::try_from(script_len.value)
        .ok()
        .and_then(|len| len.checked_add(OUTPUT_VALUE_SIZE + script_len.width()))
        .ok_or(SpvError::MalformedVout)
}

/// Pushed data of `6a <push> <data>`, `None` unless the push spans the whole script
fn op_return_push(output: &[u8]) -> Result<Option<Vec<u8>>> {
    let script = bytes(output, 8..11)?;
    if script[1] != OP_RETURN {
        return Ok(None);
    }
    let push = script[2];
    if push > OP_PUSHBYTES_75 {
        debug!(push, "OP_RETURN uses an unsupported push opcode");
        return Err(SpvError::UnsupportedOpReturnPush(push));
    }
    if script[0] as usize != push as usize + 2 {
        debug!(script_len = script[0], push, "OP_RETURN push does not span the script");
        return Ok(None);
    }
    Ok(Some(bytes(output, 11..11 + push as usize)?.to_vec()))
}

/// The pushed bytes of an OP_RETURN output
///
/// Only direct pushes (opcodes 0x00..=0x4b) that cover the rest of the script
/// are understood.
pub fn extract_op_return_data(output: &[u8]) -> Result<Vec<u8>> {
    op_return_push(output)?.ok_or(SpvError::UnrecognizedOutputType)
}

/// Matches the script against the standard templates, `None` if none fit
fn match_template(output: &[u8]) -> Result<Option<OutputType>> {
    let tag = bytes(output, 8..10)?;
    if tag[1] == OP_RETURN {
        return Ok(op_return_push(output)?.map(OutputType::OpReturn));
    }

    let output_type = match (tag[0], tag[1]) {
        (WSH_SCRIPT_LEN, 0x00) => {
            let script = bytes(output, 9..43)?;
            (script[1] == 0x20).then(|| OutputType::Wsh(to_array(&script[2..])))
        }
        (WPKH_SCRIPT_LEN, 0x00) => {
            let script = bytes(output, 9..31)?;
            (script[1] == 0x14).then(|| OutputType::Wpkh(to_array(&script[2..])))
        }
        (PKH_SCRIPT_LEN, OP_DUP) => {
            let script = bytes(output, 9..34)?;
            let shaped = script[1] == OP_HASH160
                && script[2] == 0x14
                && script[23] == OP_EQUALVERIFY
                && script[24] == OP_CHECKSIG;
            shaped.then(|| OutputType::Pkh(to_array(&script[3..23])))
        }
        (SH_SCRIPT_LEN, OP_HASH160) => {
            let script = bytes(output, 9..32)?;
            let shaped = script[1] == 0x14 && script[22] == OP_EQUAL;
            shaped.then(|| OutputType::Sh(to_array(&script[2..22])))
        }
        _ => None,
    };
    Ok(output_type)
}

fn to_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

/// Strict parse: an unrecognized script is an error
///
/// Use on any path where the output's value is being credited.
pub fn parse_output(output: &[u8]) -> Result<ParsedOutput> {
    let value = extract_value(output)?;
    match match_template(output)? {
        Some(output_type) => Ok(ParsedOutput { value, output_type }),
        None => {
            debug!(len = output.len(), "output script matches no known template");
            Err(SpvError::UnrecognizedOutputType)
        }
    }
}

/// Permissive parse: an unrecognized script is reported as `Nonstandard`
///
/// Truncated outputs and unsupported OP_RETURN pushes still fail.
pub fn scan_output(output: &[u8]) -> Result<ParsedOutput> {
    let value = extract_value(output)?;
    let output_type = match_template(output)?.unwrap_or(OutputType::Nonstandard);
    Ok(ParsedOutput { value, output_type })
}

/// Committed hash of a WPKH, WSH, PKH or SH output
pub fn extract_hash(output: &[u8]) -> Result<Vec<u8>> {
    match match_template(output)? {
        Some(OutputType::OpReturn(_)) | None | Some(OutputType::Nonstandard) => {
            Err(SpvError::UnrecognizedOutputType)
        }
        Some(hashed) => Ok(hashed.payload().to_vec()),
    }
}

/// Walks a count-prefixed vout, yielding `(index, output)` until `stop` returns true
fn walk_vout<'a>(vout: &'a [u8], mut stop: impl FnMut(usize, &'a [u8]) -> bool) -> Result<(u64, usize)> {
    let count = read_var_int(vout, 0).map_err(|_| SpvError::MalformedVout)?;
    let mut offset = count.width();

    for i in 0..count.value {
        let rest = vout.get(offset..).ok_or(SpvError::MalformedVout)?;
        let len = determine_output_length(rest).map_err(|_| SpvError::MalformedVout)?;
        let output = bytes(rest, 0..len)?;
        offset += len;
        if stop(i as usize, output) {
            break;
        }
    }
    Ok((count.value, offset))
}

/// Output at `index` within a count-prefixed vout (any script length encoding)
pub fn extract_output_at_index(vout: &[u8], index: usize) -> Result<&[u8]> {
    let mut found = None;
    let (count, _) = walk_vout(vout, |i, output| {
        if i == index {
            found = Some(output);
        }
        i == index
    })?;
    found.ok_or(SpvError::OutputIndexOutOfRange {
        index,
        count: count as usize,
    })
}

/// Splits a count-prefixed vout into its outputs
///
/// The count must be nonzero, every output fully present and nothing may trail.
pub fn split_vout(vout: &[u8]) -> Result<Vec<&[u8]>> {
    let mut outputs = Vec::new();
    let (count, end) = walk_vout(vout, |_, output| {
        outputs.push(output);
        false
    })?;
    if count == 0 || end != vout.len() {
        debug!(count, end, len = vout.len(), "vout is empty or has trailing bytes");
        return Err(SpvError::MalformedVout);
    }
    Ok(outputs)
}

pub fn validate_vout(vout: &[u8]) -> bool {
    split_vout(vout).is_ok()
}
