//! Proof of work: 256-bit targets, compact encoding, difficulty and retargeting

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, SpvError};
use crate::types::Hash;

/// 256-bit unsigned integer for Bitcoin target calculations
///
/// Stored as four little-endian 64-bit words (`.0[0]` is least significant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct U256([u64; 4]);

impl U256 {
    pub const MAX: U256 = U256([u64::MAX; 4]);

    pub const fn zero() -> Self {
        U256([0; 4])
    }

    pub const fn from_u32(value: u32) -> Self {
        U256([value as u64, 0, 0, 0])
    }

    pub const fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&x| x == 0)
    }

    /// Least significant 64 bits
    pub fn low_u64(&self) -> u64 {
        self.0[0]
    }

    /// Interprets 32 bytes as a big-endian integer
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *word = u64::from_be_bytes(chunk);
        }
        U256(words)
    }

    /// Interprets 32 bytes as a little-endian integer
    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        let mut reversed = *bytes;
        reversed.reverse();
        Self::from_be_bytes(&reversed)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, &word) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            bytes[start..start + 8].copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut bytes = self.to_be_bytes();
        bytes.reverse();
        bytes
    }

    pub fn shl(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::zero();
        }

        let mut result = U256::zero();
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;

        for i in 0..4 {
            if i + word_shift < 4 {
                result.0[i + word_shift] |= self.0[i] << bit_shift;
                if bit_shift > 0 && i + word_shift + 1 < 4 {
                    result.0[i + word_shift + 1] |= self.0[i] >> (64 - bit_shift);
                }
            }
        }

        result
    }

    pub fn shr(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::zero();
        }

        let mut result = U256::zero();
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;

        for i in word_shift..4 {
            result.0[i - word_shift] |= self.0[i] >> bit_shift;
            if bit_shift > 0 && i > word_shift {
                result.0[i - word_shift - 1] |= self.0[i] << (64 - bit_shift);
            }
        }

        result
    }

    pub fn bitand(&self, other: &Self) -> Self {
        let mut result = *self;
        for (word, rhs) in result.0.iter_mut().zip(other.0.iter()) {
            *word &= rhs;
        }
        result
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let mut result = U256::zero();
        let mut carry = false;
        for i in 0..4 {
            let (sum, c1) = self.0[i].overflowing_add(other.0[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            result.0[i] = sum;
            carry = c1 || c2;
        }
        if carry {
            None
        } else {
            Some(result)
        }
    }

    pub fn saturating_add(&self, other: &Self) -> Self {
        self.checked_add(other).unwrap_or(U256::MAX)
    }

    /// Caller guarantees `self >= other`
    fn wrapping_sub(&self, other: &Self) -> Self {
        let mut result = U256::zero();
        let mut borrow = false;
        for i in 0..4 {
            let (diff, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (diff, b2) = diff.overflowing_sub(borrow as u64);
            result.0[i] = diff;
            borrow = b1 || b2;
        }
        result
    }

    /// Multiply by u64, `None` on overflow
    pub fn checked_mul_u64(&self, rhs: u64) -> Option<Self> {
        let mut carry = 0u128;
        let mut result = U256::zero();

        for i in 0..4 {
            let product = (self.0[i] as u128) * (rhs as u128) + carry;
            result.0[i] = product as u64;
            carry = product >> 64;
        }

        if carry > 0 {
            None
        } else {
            Some(result)
        }
    }

    /// Integer division by u64. Division by zero returns `U256::MAX`.
    pub fn div_u64(&self, rhs: u64) -> Self {
        if rhs == 0 {
            return U256::MAX;
        }

        let mut remainder = 0u128;
        let mut result = U256::zero();

        for i in (0..4).rev() {
            let dividend = (remainder << 64) | (self.0[i] as u128);
            result.0[i] = (dividend / rhs as u128) as u64;
            remainder = dividend % rhs as u128;
        }

        result
    }

    /// Full 256-bit division, `None` when dividing by zero
    pub fn checked_div(&self, divisor: &Self) -> Option<Self> {
        if divisor.is_zero() {
            return None;
        }
        if self < divisor {
            return Some(U256::zero());
        }

        // Shift-subtract long division over the dividend's significant bits
        let top = self.highest_set_bit().unwrap_or(0);
        let mut quotient = U256::zero();
        let mut remainder = U256::zero();
        for bit in (0..=top).rev() {
            remainder = remainder.shl(1);
            if self.bit(bit) {
                remainder.0[0] |= 1;
            }
            if remainder >= *divisor {
                remainder = remainder.wrapping_sub(divisor);
                quotient.0[(bit / 64) as usize] |= 1u64 << (bit % 64);
            }
        }
        Some(quotient)
    }

    fn bit(&self, index: u32) -> bool {
        (self.0[(index / 64) as usize] >> (index % 64)) & 1 == 1
    }

    /// Position of the most significant set bit (0 = least significant)
    pub fn highest_set_bit(&self) -> Option<u32> {
        for (i, &word) in self.0.iter().enumerate().rev() {
            if word != 0 {
                return Some(i as u32 * 64 + (63 - word.leading_zeros()));
            }
        }
        None
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.to_be_bytes() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Expand target from compact representation
///
/// The compact format is `0xEEMMMMMM`: a one-byte exponent and a three-byte
/// mantissa. The target is `mantissa * 256^(exponent - 3)`.
///
/// All 24 mantissa bits are used; there is no sign bit. A target whose
/// significant bits would be shifted past bit 255 is rejected with
/// `InvalidTarget`.
pub fn expand_target(bits: u32) -> Result<U256> {
    let exponent = bits >> 24;
    let mantissa = U256::from_u32(bits & 0x00ffffff);

    if mantissa.is_zero() {
        return Ok(U256::zero());
    }

    if exponent <= 3 {
        return Ok(mantissa.shr(8 * (3 - exponent)));
    }

    let shift = 8 * (exponent - 3);
    let top = mantissa.highest_set_bit().unwrap_or(0);
    if top + shift >= 256 {
        return Err(SpvError::InvalidTarget(bits));
    }
    Ok(mantissa.shl(shift))
}

/// Compress target to compact representation (Bitcoin Core's GetCompact)
///
/// Inverse of `expand_target` for targets that fit in 23 significant bits.
/// Targets with more precision are truncated: `expand_target(compress_target(t)) <= t`.
/// This is a property of the nBits format, not something to correct.
pub fn compress_target(target: &U256) -> u32 {
    let highest_bit = match target.highest_set_bit() {
        Some(bit) => bit,
        None => return 0,
    };

    let mut size = (highest_bit + 8) / 8;
    let mut compact = if size <= 3 {
        target.low_u64() << (8 * (3 - size))
    } else {
        target.shr(8 * (size - 3)).low_u64()
    };

    // 0x00800000 is the sign bit in the compact format
    if compact & 0x00800000 != 0 {
        compact >>= 8;
        size += 1;
    }

    (size << 24) | (compact as u32 & 0x007fffff)
}

/// Returns `true` if the big-endian digest is strictly below the target
///
/// A zero target can never be met.
pub fn validate_header_work(digest_be: &Hash, target: &U256) -> bool {
    if target.is_zero() {
        return false;
    }
    U256::from_be_bytes(digest_be) < *target
}

/// Relative difficulty: `difficulty_1_target / target`
///
/// A zero target contributes zero difficulty.
pub fn calculate_difficulty_with(difficulty_one: &U256, target: &U256) -> U256 {
    difficulty_one.checked_div(target).unwrap_or_else(U256::zero)
}

/// Relative difficulty against the mainnet difficulty-1 target (0x1d00ffff)
pub fn calculate_difficulty(target: &U256) -> U256 {
    let difficulty_one = U256::from_u32(0xffff).shl(8 * ((DIFFICULTY_ONE_BITS >> 24) - 3));
    calculate_difficulty_with(&difficulty_one, target)
}

/// Bitcoin difficulty retarget over the default two-week period
pub fn retarget_algorithm(
    previous_target: &U256,
    first_timestamp: u32,
    second_timestamp: u32,
) -> Result<U256> {
    retarget_algorithm_with_period(previous_target, first_timestamp, second_timestamp, RETARGET_PERIOD)
}

/// Retarget: `previous_target * clamp(elapsed, period/4, period*4) / period`
pub fn retarget_algorithm_with_period(
    previous_target: &U256,
    first_timestamp: u32,
    second_timestamp: u32,
    period: u64,
) -> Result<U256> {
    let elapsed = second_timestamp as i64 - first_timestamp as i64;
    let lower = (period / 4) as i64;
    let upper = period.saturating_mul(4).min(i64::MAX as u64) as i64;
    let clamped = elapsed.clamp(lower, upper) as u64;

    let scaled = previous_target
        .checked_mul_u64(clamped)
        .ok_or(SpvError::TargetOverflow)?;
    Ok(scaled.div_u64(period))
}

/// Compares a truncated target (low bytes masked off) with a full one
///
/// Simplified logic is `(full & truncated) == truncated`.
pub fn truncated_target_equality(truncated: &U256, full: &U256) -> bool {
    full.bitand(truncated) == *truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff1() -> U256 {
        expand_target(0x1d00ffff).unwrap()
    }

    #[test]
    fn test_expand_target_genesis() {
        let target = diff1();
        let mut expected = [0u8; 32];
        expected[4] = 0xff;
        expected[5] = 0xff;
        assert_eq!(target.to_be_bytes(), expected);
    }

    #[test]
    fn test_expand_target_zero_mantissa() {
        assert!(expand_target(0x1d000000).unwrap().is_zero());
    }

    #[test]
    fn test_expand_target_small_exponents() {
        assert_eq!(expand_target(0x03123456).unwrap(), U256::from_u32(0x123456));
        assert_eq!(expand_target(0x02123456).unwrap(), U256::from_u32(0x1234));
        assert_eq!(expand_target(0x01123456).unwrap(), U256::from_u32(0x12));
        assert!(expand_target(0x00123456).unwrap().is_zero());
    }

    #[test]
    fn test_expand_target_exponent_4() {
        assert_eq!(expand_target(0x04123456).unwrap(), U256::from_u32(0x12345600));
    }

    #[test]
    fn test_expand_target_overflow() {
        // 0x00ffff << 8*29 needs 248 bits: fits
        assert!(expand_target(0x2000ffff).is_ok());
        // 0x00ffff << 8*30 needs 256 bits: highest bit 255 still fits
        assert!(expand_target(0x2100ffff).is_ok());
        assert_eq!(expand_target(0x2200ffff), Err(SpvError::InvalidTarget(0x2200ffff)));
        assert_eq!(expand_target(0xff000001), Err(SpvError::InvalidTarget(0xff000001)));
    }

    #[test]
    fn test_compress_round_trip_representable() {
        for bits in [0x1d00ffffu32, 0x1b0404cb, 0x1a05db8b, 0x207fffff, 0x03123456, 0x05009234] {
            let target = expand_target(bits).unwrap();
            assert_eq!(compress_target(&target), bits, "bits 0x{bits:08x}");
        }
    }

    #[test]
    fn test_compress_lossy_high_precision() {
        // 0x123456789 has more than 23 significant bits
        let target = U256::from_u64(0x1_2345_6789);
        let bits = compress_target(&target);
        let back = expand_target(bits).unwrap();
        assert!(back <= target);
        assert_ne!(back, target);
    }

    #[test]
    fn test_compress_zero() {
        assert_eq!(compress_target(&U256::zero()), 0);
    }

    #[test]
    fn test_compress_sign_bit_bumps_exponent() {
        // 0x80 in the top mantissa byte would read as negative
        let target = U256::from_u32(0x800000);
        let bits = compress_target(&target);
        assert_eq!(bits, 0x04008000);
        assert_eq!(expand_target(bits).unwrap(), target);
    }

    #[test]
    fn test_difficulty_one() {
        assert_eq!(calculate_difficulty(&diff1()), U256::from_u64(1));
    }

    #[test]
    fn test_difficulty_known_value() {
        // 0xffff * 2^16 / 0x0404cb
        let target = expand_target(0x1b0404cb).unwrap();
        assert_eq!(calculate_difficulty(&target), U256::from_u64(16307));
    }

    #[test]
    fn test_difficulty_zero_target() {
        assert!(calculate_difficulty(&U256::zero()).is_zero());
    }

    #[test]
    fn test_validate_header_work() {
        let target = diff1();
        let mut digest = [0u8; 32];
        digest[4] = 0xff;
        digest[5] = 0xfe;
        assert!(validate_header_work(&digest, &target));

        // equal to target is not enough
        assert!(!validate_header_work(&target.to_be_bytes(), &target));

        digest[3] = 0x01;
        assert!(!validate_header_work(&digest, &target));

        assert!(!validate_header_work(&[0u8; 32], &U256::zero()));
    }

    #[test]
    fn test_retarget_unchanged() {
        let target = diff1();
        let result = retarget_algorithm(&target, 0, RETARGET_PERIOD as u32).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn test_retarget_halves() {
        let target = expand_target(0x1b0404cb).unwrap();
        let result = retarget_algorithm(&target, 1000, 1000 + (RETARGET_PERIOD / 2) as u32).unwrap();
        assert_eq!(result, target.div_u64(2));
    }

    #[test]
    fn test_retarget_clamped() {
        let target = expand_target(0x1b0404cb).unwrap();
        let fast = retarget_algorithm(&target, 1000, 1001).unwrap();
        assert_eq!(fast, target.div_u64(4));

        let slow = retarget_algorithm(&target, 0, u32::MAX).unwrap();
        assert_eq!(slow, target.checked_mul_u64(4).unwrap());

        // timestamps out of order clamp to the lower bound
        let backwards = retarget_algorithm(&target, 5000, 1000).unwrap();
        assert_eq!(backwards, fast);
    }

    #[test]
    fn test_retarget_overflow() {
        let result = retarget_algorithm(&U256::MAX, 0, RETARGET_PERIOD as u32);
        assert_eq!(result, Err(SpvError::TargetOverflow));
    }

    #[test]
    fn test_truncated_target_equality() {
        let full = expand_target(0x1b0404cb).unwrap().checked_add(&U256::from_u32(0xabcd)).unwrap();
        let truncated = expand_target(0x1b0404cb).unwrap();
        assert!(truncated_target_equality(&truncated, &full));
        assert!(!truncated_target_equality(&full, &truncated));
    }

    #[test]
    fn test_u256_byte_round_trip() {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let value = U256::from_be_bytes(&bytes);
        assert_eq!(value.to_be_bytes(), bytes);
        assert_eq!(U256::from_le_bytes(&value.to_le_bytes()), value);
        assert_eq!(value.low_u64(), 0x18191a1b1c1d1e1f);
    }

    #[test]
    fn test_u256_shifts() {
        let value = U256::from_u32(0x12345678);
        assert_eq!(value.shl(0), value);
        assert_eq!(value.shr(0), value);
        assert!(value.shl(300).is_zero());
        assert!(value.shr(300).is_zero());
        assert_eq!(value.shl(100).shr(100), value);
        assert_eq!(value.shl(64).0[1], 0x12345678);
        assert_eq!(value.shr(8), U256::from_u32(0x123456));
    }

    #[test]
    fn test_u256_ordering() {
        let small = U256::from_u32(0x12345678);
        let large = U256::from_u32(0x87654321);
        assert!(small < large);
        assert!(U256::from_u64(1).shl(200) > U256::from_u64(u64::MAX));
        assert_eq!(small.cmp(&small), Ordering::Equal);
    }

    #[test]
    fn test_u256_arithmetic() {
        let a = U256::from_u64(u64::MAX);
        let sum = a.checked_add(&U256::from_u64(1)).unwrap();
        assert_eq!(sum, U256::from_u64(1).shl(64));
        assert!(U256::MAX.checked_add(&U256::from_u64(1)).is_none());
        assert_eq!(U256::MAX.saturating_add(&U256::from_u64(1)), U256::MAX);

        assert_eq!(sum.checked_mul_u64(3).unwrap(), U256::from_u64(3).shl(64));
        assert!(U256::MAX.checked_mul_u64(2).is_none());

        assert_eq!(U256::from_u64(100).div_u64(7), U256::from_u64(14));
        assert_eq!(U256::from_u64(1).div_u64(0), U256::MAX);

        let big = U256::from_u64(0xdead_beef).shl(150);
        let divisor = U256::from_u64(0xbeef).shl(100);
        let q = big.checked_div(&divisor).unwrap();
        assert_eq!(q, U256::from_u64(0xdead_beef).shl(50).div_u64(0xbeef));
        assert!(big.checked_div(&U256::zero()).is_none());
        assert!(divisor.checked_div(&big).unwrap().is_zero());
    }

    #[test]
    fn test_highest_set_bit() {
        assert_eq!(U256::zero().highest_set_bit(), None);
        assert_eq!(U256::from_u32(1).highest_set_bit(), Some(0));
        assert_eq!(U256::MAX.highest_set_bit(), Some(255));
    }

    #[test]
    fn test_display() {
        let s = format!("{}", U256::from_u32(0xabcd));
        assert!(s.starts_with("0x"));
        assert!(s.ends_with("abcd"));
        assert_eq!(s.len(), 66);
    }
}
