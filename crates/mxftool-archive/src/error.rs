//! Error types for mxftool-archive.

use mxftool_core::Ul;
use thiserror::Error;

/// Archive reader/writer errors.
#[derive(Debug, Error)]
#[must_use]
pub enum Error {
    #[error("operational pattern {0} is not OP-1a")]
    NotOp1a(Ul),

    #[error("expected 3 essence container labels in the header partition, found {0}")]
    WrongContainerCount(usize),

    #[error("unknown essence container label {0} in the header partition")]
    UnknownEssenceContainer(Ul),

    #[error("expected essence element {expected}, found {actual}")]
    UnexpectedElement { expected: Ul, actual: Ul },

    #[error("system item is {0} bytes, expected 28")]
    SystemItemSize(u64),

    #[error("material package has no track duration")]
    NoDuration,

    #[error("content package size changed from {expected} to {actual} bytes")]
    ContentPackageSize { expected: u32, actual: u32 },

    #[error("cannot seek when the duration is zero")]
    SeekWithZeroDuration,

    #[error("cannot seek to {position}: beyond duration {duration}")]
    SeekBeyondDuration { position: i64, duration: i64 },

    #[error("file has {have} audio tracks, at most {max} are supported")]
    TooManyAudioTracks { have: usize, max: usize },

    #[error("content package carries {have} audio tracks, writer needs {need}")]
    ContentPackageAudioTracks { have: usize, need: usize },

    #[error("core error: {0}")]
    Core(#[from] mxftool_core::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] mxftool_meta::Error),

    #[error("file error: {0}")]
    File(#[from] mxftool_file::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
