//! Error types for mxftool-file.

use thiserror::Error;

/// Envelope errors.
#[derive(Debug, Error)]
#[must_use]
pub enum Error {
    #[error("partition index {0} is out of range")]
    PartitionIndex(usize),

    #[error("partition back-references do not chain to the header")]
    BrokenPartitionChain,

    #[error("core error: {0}")]
    Core(#[from] mxftool_core::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] mxftool_meta::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
