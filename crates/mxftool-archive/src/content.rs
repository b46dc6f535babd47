//! One archive content package: `{System, Video, Audio*}`.

use crate::Timecode;

/// Most audio elements a content package can carry.
pub const MAX_CP_AUDIO_TRACKS: usize = 8;

/// Size of the system item value: local tag + length + a 2-element array
/// of 8-byte SMPTE-12M timecodes.
pub const SYSTEM_ITEM_SIZE: u32 = 28;

/// A decoded content package. The reader reuses one instance as a read
/// cache keyed by [`ArchiveContentPackage::position`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ArchiveContentPackage {
    pub(crate) position: i64,
    pub(crate) vitc: Timecode,
    pub(crate) ltc: Timecode,
    pub(crate) video: Vec<u8>,
    pub(crate) audio: Vec<Vec<u8>>,
    /// Total encoded size of the package, fixed for one file.
    pub(crate) size: u32,
}

impl ArchiveContentPackage {
    /// Edit-unit position this package was read from.
    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn vitc(&self) -> Timecode {
        self.vitc
    }

    pub fn ltc(&self) -> Timecode {
        self.ltc
    }

    pub fn video(&self) -> &[u8] {
        &self.video
    }

    pub fn num_audio_tracks(&self) -> usize {
        self.audio.len()
    }

    /// Audio bytes of track `index` (0-based).
    pub fn audio(&self, index: usize) -> &[u8] {
        &self.audio[index]
    }
}
