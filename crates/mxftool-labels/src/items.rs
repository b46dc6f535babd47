//! Item keys of the baseline sets.
//!
//! Baseline item keys share the `06.0e2b34.010101` element prefix with the
//! registered local tag repeated in octets 10-11; the primer pack maps the
//! tags back to these keys per file.

use mxftool_core::Ul;

const fn item_key(hi: u8, lo: u8) -> Ul {
    Ul([
        0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x01, 0x0d, 0x01, hi, lo, 0x00, 0x00, 0x00, 0x00,
    ])
}

// InterchangeObject
pub const INSTANCE_UID: Ul = item_key(0x3c, 0x0a);
pub const GENERATION_UID: Ul = item_key(0x01, 0x02);

// Preface
pub const LAST_MODIFIED_DATE: Ul = item_key(0x3b, 0x02);
pub const VERSION: Ul = item_key(0x3b, 0x05);
pub const OBJECT_MODEL_VERSION: Ul = item_key(0x3b, 0x07);
pub const PRIMARY_PACKAGE: Ul = item_key(0x3b, 0x08);
pub const IDENTIFICATIONS: Ul = item_key(0x3b, 0x06);
pub const CONTENT_STORAGE: Ul = item_key(0x3b, 0x03);
pub const OPERATIONAL_PATTERN: Ul = item_key(0x3b, 0x09);
pub const ESSENCE_CONTAINERS: Ul = item_key(0x3b, 0x0a);
pub const DM_SCHEMES: Ul = item_key(0x3b, 0x0b);
pub const BYTE_ORDER: Ul = item_key(0x3b, 0x01);
pub const DICTIONARY: Ul = item_key(0x3b, 0x04);

// Identification
pub const THIS_GENERATION_UID: Ul = item_key(0x3c, 0x09);
pub const COMPANY_NAME: Ul = item_key(0x3c, 0x01);
pub const PRODUCT_NAME: Ul = item_key(0x3c, 0x02);
pub const PRODUCT_VERSION: Ul = item_key(0x3c, 0x03);
pub const VERSION_STRING: Ul = item_key(0x3c, 0x04);
pub const PRODUCT_UID: Ul = item_key(0x3c, 0x05);
pub const MODIFICATION_DATE: Ul = item_key(0x3c, 0x06);
pub const TOOLKIT_VERSION: Ul = item_key(0x3c, 0x07);
pub const PLATFORM: Ul = item_key(0x3c, 0x08);

// ContentStorage
pub const PACKAGES: Ul = item_key(0x19, 0x01);
pub const ESSENCE_CONTAINER_DATA: Ul = item_key(0x19, 0x02);

// EssenceContainerData
pub const LINKED_PACKAGE_UID: Ul = item_key(0x27, 0x01);
pub const INDEX_SID: Ul = item_key(0x3f, 0x06);
pub const BODY_SID: Ul = item_key(0x3f, 0x07);

// GenericPackage
pub const PACKAGE_UID: Ul = item_key(0x44, 0x01);
pub const PACKAGE_NAME: Ul = item_key(0x44, 0x02);
pub const PACKAGE_CREATION_DATE: Ul = item_key(0x44, 0x05);
pub const PACKAGE_MODIFIED_DATE: Ul = item_key(0x44, 0x04);
pub const TRACKS: Ul = item_key(0x44, 0x03);

// SourcePackage
pub const DESCRIPTOR: Ul = item_key(0x47, 0x01);

// GenericTrack
pub const TRACK_ID: Ul = item_key(0x48, 0x01);
pub const TRACK_NUMBER: Ul = item_key(0x48, 0x04);
pub const TRACK_NAME: Ul = item_key(0x48, 0x02);
pub const SEQUENCE: Ul = item_key(0x48, 0x03);

// Track (timeline)
pub const EDIT_RATE: Ul = item_key(0x4b, 0x01);
pub const ORIGIN: Ul = item_key(0x4b, 0x02);

// StructuralComponent
pub const DATA_DEFINITION: Ul = item_key(0x02, 0x01);
pub const DURATION: Ul = item_key(0x02, 0x02);

// Sequence
pub const STRUCTURAL_COMPONENTS: Ul = item_key(0x10, 0x01);

// SourceClip
pub const START_POSITION: Ul = item_key(0x12, 0x01);
pub const SOURCE_PACKAGE_ID: Ul = item_key(0x11, 0x01);
pub const SOURCE_TRACK_ID: Ul = item_key(0x11, 0x02);

// TimecodeComponent
pub const ROUNDED_TIMECODE_BASE: Ul = item_key(0x15, 0x02);
pub const START_TIMECODE: Ul = item_key(0x15, 0x01);
pub const DROP_FRAME: Ul = item_key(0x15, 0x03);

// GenericDescriptor
pub const LOCATORS: Ul = item_key(0x2f, 0x01);

// FileDescriptor
pub const LINKED_TRACK_ID: Ul = item_key(0x30, 0x06);
pub const SAMPLE_RATE: Ul = item_key(0x30, 0x01);
pub const CONTAINER_DURATION: Ul = item_key(0x30, 0x02);
pub const ESSENCE_CONTAINER: Ul = item_key(0x30, 0x04);
pub const CODEC: Ul = item_key(0x30, 0x05);

// GenericPictureEssenceDescriptor
pub const SIGNAL_STANDARD: Ul = item_key(0x32, 0x15);
pub const FRAME_LAYOUT: Ul = item_key(0x32, 0x0c);
pub const STORED_WIDTH: Ul = item_key(0x32, 0x03);
pub const STORED_HEIGHT: Ul = item_key(0x32, 0x02);
pub const DISPLAY_HEIGHT: Ul = item_key(0x32, 0x08);
pub const DISPLAY_WIDTH: Ul = item_key(0x32, 0x09);
pub const DISPLAY_X_OFFSET: Ul = item_key(0x32, 0x0b);
pub const DISPLAY_Y_OFFSET: Ul = item_key(0x32, 0x0a);
pub const ASPECT_RATIO: Ul = item_key(0x32, 0x0e);
pub const VIDEO_LINE_MAP: Ul = item_key(0x32, 0x0d);
pub const IMAGE_ALIGNMENT_OFFSET: Ul = item_key(0x32, 0x11);
pub const IMAGE_START_OFFSET: Ul = item_key(0x32, 0x13);
pub const PICTURE_ESSENCE_CODING: Ul = item_key(0x32, 0x01);

// CDCIEssenceDescriptor
pub const COMPONENT_DEPTH: Ul = item_key(0x33, 0x01);
pub const HORIZONTAL_SUBSAMPLING: Ul = item_key(0x33, 0x02);
pub const VERTICAL_SUBSAMPLING: Ul = item_key(0x33, 0x08);
pub const COLOR_SITING: Ul = item_key(0x33, 0x03);
pub const BLACK_REF_LEVEL: Ul = item_key(0x33, 0x04);
pub const WHITE_REF_LEVEL: Ul = item_key(0x33, 0x05);
pub const COLOR_RANGE: Ul = item_key(0x33, 0x06);

// GenericSoundEssenceDescriptor
pub const AUDIO_SAMPLING_RATE: Ul = item_key(0x3d, 0x03);
pub const LOCKED: Ul = item_key(0x3d, 0x02);
pub const CHANNEL_COUNT: Ul = item_key(0x3d, 0x07);
pub const QUANTIZATION_BITS: Ul = item_key(0x3d, 0x01);

// WaveAudioDescriptor
pub const BLOCK_ALIGN: Ul = item_key(0x3d, 0x0a);
pub const SEQUENCE_OFFSET: Ul = item_key(0x3d, 0x0b);
pub const AVG_BPS: Ul = item_key(0x3d, 0x09);

// MultipleDescriptor
pub const SUB_DESCRIPTOR_UIDS: Ul = item_key(0x3f, 0x01);

// NetworkLocator
pub const URL_STRING: Ul = item_key(0x40, 0x01);

// TaggedValue
pub const TAGGED_VALUE_NAME: Ul = item_key(0x50, 0x01);
pub const TAGGED_VALUE_VALUE: Ul = item_key(0x50, 0x03);
