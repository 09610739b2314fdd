//! Bitcoin CompactSize (VarInt) decoding and encoding
//!
//! Every higher-level parser walks the variable-length regions of a buffer
//! through `read_var_int`, which reports both the value and the number of
//! bytes the encoding occupied. Non-minimal encodings are accepted.

use crate::error::{Result, SpvError};
use crate::types::VarInt;

/// Number of non-flag data bytes that follow a VarInt tag byte
pub fn determine_var_int_data_length(tag: u8) -> u8 {
    match tag {
        0xff => 8,
        0xfe => 4,
        0xfd => 2,
        _ => 0,
    }
}

/// Reads one VarInt starting at `offset`
pub fn read_var_int(buf: &[u8], offset: usize) -> Result<VarInt> {
    let tag = *buf.get(offset).ok_or(SpvError::MalformedVarInt { offset })?;
    let data_len = determine_var_int_data_length(tag) as usize;
    if data_len == 0 {
        return Ok(VarInt {
            value: tag as u64,
            data_length: 1,
        });
    }

    let start = offset + 1;
    let data = buf
        .get(start..start + data_len)
        .ok_or(SpvError::MalformedVarInt { offset })?;

    let mut le = [0u8; 8];
    le[..data_len].copy_from_slice(data);

    Ok(VarInt {
        value: u64::from_le_bytes(le),
        data_length: (data_len + 1) as u8,
    })
}

/// Appends the minimal CompactSize encoding of `n`
pub fn write_var_int(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte() {
        let v = read_var_int(&[0x00], 0).unwrap();
        assert_eq!(v, VarInt { value: 0, data_length: 1 });

        let v = read_var_int(&[0xaa, 0xfc], 1).unwrap();
        assert_eq!(v, VarInt { value: 0xfc, data_length: 1 });
    }

    #[test]
    fn test_two_byte() {
        let v = read_var_int(&[0xfd, 0x01, 0x02], 0).unwrap();
        assert_eq!(v.value, 0x0201);
        assert_eq!(v.data_length, 3);
    }

    #[test]
    fn test_four_byte() {
        let v = read_var_int(&[0xfe, 0x01, 0x02, 0x03, 0x04], 0).unwrap();
        assert_eq!(v.value, 0x04030201);
        assert_eq!(v.data_length, 5);
    }

    #[test]
    fn test_eight_byte() {
        let v = read_var_int(&[0xff, 1, 2, 3, 4, 5, 6, 7, 8], 0).unwrap();
        assert_eq!(v.value, 0x0807060504030201);
        assert_eq!(v.width(), 9);
    }

    #[test]
    fn test_non_minimal_accepted() {
        let v = read_var_int(&[0xfd, 0x05, 0x00], 0).unwrap();
        assert_eq!(v.value, 5);
        assert_eq!(v.data_length, 3);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(read_var_int(&[], 0), Err(SpvError::MalformedVarInt { offset: 0 }));
        assert_eq!(read_var_int(&[0x01], 1), Err(SpvError::MalformedVarInt { offset: 1 }));
        assert_eq!(read_var_int(&[0xfd, 0x01], 0), Err(SpvError::MalformedVarInt { offset: 0 }));
        assert_eq!(read_var_int(&[0xff, 0, 0, 0, 0, 0, 0, 0], 0), Err(SpvError::MalformedVarInt { offset: 0 }));
    }

    #[test]
    fn test_data_length_tags() {
        assert_eq!(determine_var_int_data_length(0x01), 0);
        assert_eq!(determine_var_int_data_length(0xfc), 0);
        assert_eq!(determine_var_int_data_length(0xfd), 2);
        assert_eq!(determine_var_int_data_length(0xfe), 4);
        assert_eq!(determine_var_int_data_length(0xff), 8);
    }

    #[test]
    fn test_write_widths() {
        for (n, width) in [(0u64, 1usize), (0xfc, 1), (0xfd, 3), (0xffff, 3), (0x10000, 5), (0x1_0000_0000, 9)] {
            let mut buf = Vec::new();
            write_var_int(&mut buf, n);
            assert_eq!(buf.len(), width);
            let decoded = read_var_int(&buf, 0).unwrap();
            assert_eq!(decoded.value, n);
            assert_eq!(decoded.width(), width);
        }
    }
}
