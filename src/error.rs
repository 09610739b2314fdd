//! Error types for SPV parsing and validation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpvError {
    #[error("Malformed VarInt: not enough bytes at offset {offset}")]
    MalformedVarInt { offset: usize },

    #[error("Invalid transaction prefix: expected version 1 or 2 followed by segwit marker and flag")]
    InvalidPrefix,

    #[error("Unsupported input format at index {0}: scriptSig must be empty")]
    UnsupportedInputFormat(usize),

    #[error("Invalid input length: {0} bytes")]
    InvalidInputLength(usize),

    #[error("Unsupported OP_RETURN push opcode: 0x{0:02x}")]
    UnsupportedOpReturnPush(u8),

    #[error("Unrecognized output script type")]
    UnrecognizedOutputType,

    #[error("Unsupported output format at index {0}: script length must be a single-byte VarInt")]
    UnsupportedOutputFormat(usize),

    #[error("Invalid header length: {0} bytes (must be exactly 80)")]
    InvalidHeaderLength(usize),

    #[error("Header chain length {0} is not a multiple of 80")]
    MisalignedHeaderChain(usize),

    #[error("Header chain too long: {count} headers (max {max})")]
    HeaderChainTooLong { count: usize, max: usize },

    #[error("Header chain linkage broken at header {0}")]
    ChainLinkageBroken(usize),

    #[error("Header {0} does not meet its own difficulty target")]
    InsufficientWork(usize),

    #[error("Invalid compact target: 0x{0:08x}")]
    InvalidTarget(u32),

    #[error("Retarget arithmetic overflowed 256 bits")]
    TargetOverflow,

    #[error("Malformed vin")]
    MalformedVin,

    #[error("Malformed vout")]
    MalformedVout,

    #[error("Input index {index} out of range ({count} inputs)")]
    InputIndexOutOfRange { index: usize, count: usize },

    #[error("Output index {index} out of range ({count} outputs)")]
    OutputIndexOutOfRange { index: usize, count: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SpvError>;
