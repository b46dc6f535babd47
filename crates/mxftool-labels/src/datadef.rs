//! Data definitions and descriptive metadata scheme labels.
//!
//! The legacy variants are the AAF class identifiers that Avid-generated
//! files carry in place of the SMPTE labels; comparisons accept either.

use mxftool_core::Ul;

pub const PICTURE: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x01, 0x03, 0x02, 0x02, 0x01, 0x00, 0x00, 0x00,
]);

pub const SOUND: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x01, 0x03, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
]);

pub const TIMECODE: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x01, 0x03, 0x02, 0x01, 0x01, 0x00, 0x00, 0x00,
]);

pub const LEGACY_PICTURE: Ul = Ul([
    0x6f, 0x3c, 0x8c, 0xe1, 0x6c, 0xef, 0x11, 0xd2, 0x80, 0x7d, 0x00, 0x60, 0x08, 0x14, 0x3e, 0x6f,
]);

pub const LEGACY_SOUND: Ul = Ul([
    0x78, 0xe1, 0xeb, 0xe1, 0x6c, 0xef, 0x11, 0xd2, 0x80, 0x7d, 0x00, 0x60, 0x08, 0x14, 0x3e, 0x6f,
]);

pub const LEGACY_TIMECODE: Ul = Ul([
    0x7f, 0x27, 0x5e, 0x81, 0x77, 0xe5, 0x11, 0xd2, 0x80, 0x7d, 0x00, 0x60, 0x08, 0x14, 0x3e, 0x6f,
]);

pub fn is_picture(label: &Ul) -> bool {
    label.matches_ignoring_version(&PICTURE) || *label == LEGACY_PICTURE
}

pub fn is_sound(label: &Ul) -> bool {
    label.matches_ignoring_version(&SOUND) || *label == LEGACY_SOUND
}

pub fn is_timecode(label: &Ul) -> bool {
    label.matches_ignoring_version(&TIMECODE) || *label == LEGACY_TIMECODE
}

/// BBC D3 preservation descriptive metadata scheme.
pub const D3_PRESERVATION_SCHEME: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x04, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00,
]);

/// Legacy DMS-1 scheme label referenced by Avid clip files.
pub const LEGACY_DMS1: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x02, 0x0d, 0x01, 0x04, 0x01, 0x01, 0x01, 0x01, 0x00,
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_labels_match_their_kind() {
        assert!(is_picture(&PICTURE));
        assert!(is_picture(&LEGACY_PICTURE));
        assert!(!is_picture(&SOUND));
        assert!(is_sound(&LEGACY_SOUND));
        assert!(is_timecode(&LEGACY_TIMECODE));
        assert!(!is_timecode(&LEGACY_SOUND));
    }
}
