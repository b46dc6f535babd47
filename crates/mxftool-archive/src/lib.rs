//! Archive MXF: frame-wrapped OP-1a content packages for preservation
//! workflows.
//!
//! Each edit unit is a fixed tuple of essence elements `{System Item,
//! Video Item, Audio Item 1..N}`. The 28-byte system item carries the
//! VITC and LTC SMPTE-12M timecodes; the reader can search for a
//! timecode, switching from a linear scan to a single extrapolated seek
//! once the embedded timecodes have been incrementing cleanly.

mod content;
mod error;
mod reader;
mod timecode;
mod writer;

pub use content::{ArchiveContentPackage, MAX_CP_AUDIO_TRACKS, SYSTEM_ITEM_SIZE};
pub use error::{Error, Result};
pub use reader::ArchiveReader;
pub use timecode::Timecode;
pub use writer::{register_archive_extensions, ArchiveWriter};
