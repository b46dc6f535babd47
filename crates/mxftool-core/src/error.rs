//! Error types for mxftool-core.

use crate::Ul;
use thiserror::Error;

/// Wire-level container errors.
#[derive(Debug, Error)]
#[must_use]
pub enum Error {
    #[error("unexpected end of value: need {need} bytes, have {have}")]
    UnexpectedEof { need: usize, have: usize },

    #[error("BER length uses {0} bytes, maximum is 8")]
    BerWidthTooLarge(u8),

    #[error("length field width {0} is invalid: must be 1-9")]
    InvalidLlen(u8),

    #[error("length {len} does not fit a fixed {llen}-byte length field")]
    FixedLengthOverflow { llen: u8, len: u64 },

    #[error("filler of {size} bytes is below the minimum KLV size {min}")]
    FillTooSmall { size: u64, min: u64 },

    #[error("cannot fill backwards: position {position} is past target {target}")]
    FillOverrun { position: u64, target: u64 },

    #[error("expected key {expected}, found {actual}")]
    KeyMismatch { expected: Ul, actual: Ul },

    #[error("not a partition pack key: {0}")]
    NotAPartitionKey(Ul),

    #[error("header partition pack not found within the run-in limit")]
    HeaderPartitionNotFound,

    #[error("random index pack not found at the file tail")]
    RipNotFound,

    #[error("index table item 0x{tag:04X} of {len} bytes exceeds the 16-bit item limit")]
    IndexItemTooLarge { tag: u16, len: usize },

    #[error("not an index table segment key: {0}")]
    NotAnIndexKey(Ul),

    #[error("item 0x{tag:04X} has invalid length {len}")]
    InvalidItemLength { tag: u16, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
