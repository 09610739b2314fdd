//! Bitcoin wire-format and proof-of-work constants

/// Serialized block header size
pub const HEADER_SIZE: usize = 80;

/// Size of a double-SHA256 digest
pub const HASH_SIZE: usize = 32;

/// Transaction prefix: 4-byte version, segwit marker, segwit flag
pub const PREFIX_SIZE: usize = 6;

/// Segwit marker and flag bytes that follow the version's first byte
pub const SEGWIT_PREFIX_TAIL: [u8; 5] = [0x00, 0x00, 0x00, 0x00, 0x01];

/// Outpoint: 32-byte txid + 4-byte index
pub const OUTPOINT_SIZE: usize = 36;

/// Witness input: outpoint + empty scriptSig length byte + sequence
pub const WITNESS_INPUT_SIZE: usize = 41;

/// Output value field width
pub const OUTPUT_VALUE_SIZE: usize = 8;

/// Locktime field width
pub const LOCKTIME_SIZE: usize = 4;

// Script opcodes and length tags used by output classification
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_PUSHBYTES_75: u8 = 0x4b;

/// P2WPKH script length (0x00 0x14 <20>)
pub const WPKH_SCRIPT_LEN: u8 = 0x16;
/// P2WSH script length (0x00 0x20 <32>)
pub const WSH_SCRIPT_LEN: u8 = 0x22;
/// P2PKH script length (OP_DUP OP_HASH160 0x14 <20> OP_EQUALVERIFY OP_CHECKSIG)
pub const PKH_SCRIPT_LEN: u8 = 0x19;
/// P2SH script length (OP_HASH160 0x14 <20> OP_EQUAL)
pub const SH_SCRIPT_LEN: u8 = 0x17;

/// Sighash base types
pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
/// Sighash modifier
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Sequence number for final input
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// BIP68: relative lock-time disabled when this bit is set
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// Compact form of the difficulty-1 target on mainnet and testnet
pub const DIFFICULTY_ONE_BITS: u32 = 0x1d00ffff;

/// Difficulty adjustment interval: 2016 blocks
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 2016;

/// Target time per block: 10 minutes
pub const TARGET_TIME_PER_BLOCK: u64 = 600;

/// Expected duration of one retarget period in seconds
pub const RETARGET_PERIOD: u64 = DIFFICULTY_ADJUSTMENT_INTERVAL * TARGET_TIME_PER_BLOCK;
