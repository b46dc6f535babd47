//! Interchange set keys.
//!
//! All baseline set keys share the header-metadata prefix
//! `06.0e2b34.025301` with the set number in octet 14.

use mxftool_core::Ul;

const fn set_key(number: u8) -> Ul {
    Ul([
        0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01, 0x01, number,
        0x00,
    ])
}

/// Abstract root of every interchange set.
pub const INTERCHANGE_OBJECT: Ul = set_key(0x01);
pub const STRUCTURAL_COMPONENT: Ul = set_key(0x02);
pub const SEQUENCE: Ul = set_key(0x0f);
pub const SOURCE_CLIP: Ul = set_key(0x11);
pub const TIMECODE_COMPONENT: Ul = set_key(0x14);
pub const CONTENT_STORAGE: Ul = set_key(0x18);
pub const ESSENCE_CONTAINER_DATA: Ul = set_key(0x23);
pub const GENERIC_DESCRIPTOR: Ul = set_key(0x24);
pub const FILE_DESCRIPTOR: Ul = set_key(0x25);
pub const GENERIC_PICTURE_ESSENCE_DESCRIPTOR: Ul = set_key(0x27);
pub const CDCI_ESSENCE_DESCRIPTOR: Ul = set_key(0x28);
pub const TAPE_DESCRIPTOR: Ul = set_key(0x2e);
pub const PREFACE: Ul = set_key(0x2f);
pub const IDENTIFICATION: Ul = set_key(0x30);
pub const LOCATOR: Ul = set_key(0x31);
pub const NETWORK_LOCATOR: Ul = set_key(0x32);
pub const GENERIC_PACKAGE: Ul = set_key(0x34);
pub const MATERIAL_PACKAGE: Ul = set_key(0x36);
pub const SOURCE_PACKAGE: Ul = set_key(0x37);
pub const GENERIC_TRACK: Ul = set_key(0x38);
pub const TRACK: Ul = set_key(0x3b);
pub const TAGGED_VALUE: Ul = set_key(0x3f);
pub const GENERIC_SOUND_ESSENCE_DESCRIPTOR: Ul = set_key(0x42);
pub const MULTIPLE_DESCRIPTOR: Ul = set_key(0x44);
pub const WAVE_AUDIO_DESCRIPTOR: Ul = set_key(0x48);
/// Dictionary, referenced from the preface in AAF-derived files.
pub const DICTIONARY: Ul = set_key(0x22);
