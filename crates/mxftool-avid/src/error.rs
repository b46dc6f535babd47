//! Error types for mxftool-avid.

use thiserror::Error;

/// Clip writer errors.
#[derive(Debug, Error)]
#[must_use]
pub enum Error {
    #[error("track {0} is already registered")]
    TrackAlreadyRegistered(u32),

    #[error("track {0} is not registered")]
    UnknownTrack(u32),

    #[error("track ids start at 1")]
    InvalidTrackId,

    #[error("{kind} essence is not supported in this project format")]
    UnsupportedInProjectFormat { kind: &'static str },

    #[error("MJPEG tracks accept a single sample per write")]
    SingleSampleOnly,

    #[error("sample data is {actual} bytes, expected {expected}")]
    SampleSizeMismatch { expected: u64, actual: usize },

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
