//! Avid / AAF extension keys.
//!
//! Avid-compatible files add a MetaDictionary/Dictionary subgraph, extra
//! preface and package items, and attach project attributes as tagged
//! values whose payload uses the AAF indirect encoding: a leading
//! endianness marker (`0x42` big, `0x4c` little) followed by the
//! half-swapped type label and the raw value.

use mxftool_core::Ul;

// ---- set keys ------------------------------------------------------------

pub const META_DICTIONARY: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x02, 0x25, 0x00, 0x00,
]);

/// Abstract parent of class and property definitions.
pub const META_DEFINITION: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x02, 0x24, 0x00, 0x00,
]);

pub const CLASS_DEFINITION: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x02, 0x01, 0x00, 0x00,
]);

pub const PROPERTY_DEFINITION: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x02, 0x02, 0x00, 0x00,
]);

// ---- item keys -----------------------------------------------------------

const fn avid_item_key(group: u8, ord: u8) -> Ul {
    Ul([
        0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x0c, 0x0e, 0x04, group, ord, 0x00, 0x00, 0x00,
        0x00,
    ])
}

// MetaDictionary
pub const CLASS_DEFINITIONS: Ul = avid_item_key(0x01, 0x01);
// ClassDefinition / PropertyDefinition
pub const META_DEFINITION_IDENTIFICATION: Ul = avid_item_key(0x02, 0x01);
pub const META_DEFINITION_NAME: Ul = avid_item_key(0x02, 0x02);
pub const PARENT_CLASS: Ul = avid_item_key(0x02, 0x03);
pub const IS_CONCRETE: Ul = avid_item_key(0x02, 0x04);
pub const CLASS_PROPERTIES: Ul = avid_item_key(0x02, 0x05);
pub const LOCAL_IDENTIFICATION: Ul = avid_item_key(0x02, 0x06);
pub const IS_OPTIONAL: Ul = avid_item_key(0x02, 0x07);
pub const PROPERTY_TYPE: Ul = avid_item_key(0x02, 0x08);

// Preface
pub const PROJECT_NAME: Ul = avid_item_key(0x03, 0x01);
pub const PROJECT_EDIT_RATE: Ul = avid_item_key(0x03, 0x02);
pub const MASTER_MOB_ID: Ul = avid_item_key(0x03, 0x03);
pub const ESSENCE_FILE_MOB_ID: Ul = avid_item_key(0x03, 0x04);

// GenericPackage
pub const MOB_ATTRIBUTE_LIST: Ul = avid_item_key(0x04, 0x01);
pub const USER_COMMENTS: Ul = avid_item_key(0x04, 0x02);
pub const CONVERT_FRAME_RATE: Ul = avid_item_key(0x04, 0x03);
pub const APP_CODE: Ul = avid_item_key(0x04, 0x04);

// GenericPictureEssenceDescriptor
pub const RESOLUTION_ID: Ul = avid_item_key(0x05, 0x01);
pub const FRAME_SAMPLE_SIZE: Ul = avid_item_key(0x05, 0x02);
pub const IMAGE_SIZE: Ul = avid_item_key(0x05, 0x03);

// ---- indirect value encoding ---------------------------------------------

/// AAF UTF-16 string type label; the indirect prefix carries its
/// half-swapped form.
pub const UTF16_STRING_TYPE: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x01, 0x04, 0x01, 0x01, 0x01, 0x10, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

/// Big-endian indirect string prefix: 'B' + half-swapped string type key.
pub const INDIRECT_PREFIX_BE: [u8; 17] = [
    0x42, 0x01, 0x10, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x0e, 0x2b, 0x34, 0x01, 0x04,
    0x01, 0x01,
];

/// Little-endian indirect string prefix: 'L' + GUID-swapped string type key.
pub const INDIRECT_PREFIX_LE: [u8; 17] = [
    0x4c, 0x00, 0x02, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x06, 0x0e, 0x2b, 0x34, 0x01, 0x04,
    0x01, 0x01,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_prefix_is_half_swapped_string_type() {
        let swapped = UTF16_STRING_TYPE.half_swapped();
        assert_eq!(INDIRECT_PREFIX_BE[0], 0x42);
        // half-swap of the string type starts with its low half
        assert_eq!(&INDIRECT_PREFIX_BE[1..9], &swapped.0[..8]);
    }
}
