//! Baseline set and item definition tables.
//!
//! These tables seed a fresh data model with the SMPTE interchange sets.
//! Items registered with [`DYNAMIC_TAG`] have no fixed local tag; the
//! primer pack allocates one from 0x8000 per file.

use crate::{items, sets};
use mxftool_core::{ItemType, Ul};

/// Local tag value meaning "allocate dynamically at write time".
pub const DYNAMIC_TAG: u16 = 0x0000;

/// One set definition: name, key and single-inheritance parent.
#[derive(Debug, Clone, Copy)]
pub struct SetDef {
    pub name: &'static str,
    pub key: Ul,
    pub parent: Option<Ul>,
}

/// One item definition: owning set, key, local tag, wire type and whether
/// the item is mandatory when serializing.
#[derive(Debug, Clone, Copy)]
pub struct ItemDef {
    pub name: &'static str,
    pub set_key: Ul,
    pub key: Ul,
    pub tag: u16,
    pub item_type: ItemType,
    pub required: bool,
}

const fn set(name: &'static str, key: Ul, parent: Option<Ul>) -> SetDef {
    SetDef { name, key, parent }
}

const fn item(
    name: &'static str,
    set_key: Ul,
    key: Ul,
    tag: u16,
    item_type: ItemType,
    required: bool,
) -> ItemDef {
    ItemDef {
        name,
        set_key,
        key,
        tag,
        item_type,
        required,
    }
}

static BASELINE_SETS: &[SetDef] = &[
    set("InterchangeObject", sets::INTERCHANGE_OBJECT, None),
    set("Preface", sets::PREFACE, Some(sets::INTERCHANGE_OBJECT)),
    set("Identification", sets::IDENTIFICATION, Some(sets::INTERCHANGE_OBJECT)),
    set("ContentStorage", sets::CONTENT_STORAGE, Some(sets::INTERCHANGE_OBJECT)),
    set("EssenceContainerData", sets::ESSENCE_CONTAINER_DATA, Some(sets::INTERCHANGE_OBJECT)),
    set("GenericPackage", sets::GENERIC_PACKAGE, Some(sets::INTERCHANGE_OBJECT)),
    set("MaterialPackage", sets::MATERIAL_PACKAGE, Some(sets::GENERIC_PACKAGE)),
    set("SourcePackage", sets::SOURCE_PACKAGE, Some(sets::GENERIC_PACKAGE)),
    set("GenericTrack", sets::GENERIC_TRACK, Some(sets::INTERCHANGE_OBJECT)),
    set("Track", sets::TRACK, Some(sets::GENERIC_TRACK)),
    set("StructuralComponent", sets::STRUCTURAL_COMPONENT, Some(sets::INTERCHANGE_OBJECT)),
    set("Sequence", sets::SEQUENCE, Some(sets::STRUCTURAL_COMPONENT)),
    set("SourceClip", sets::SOURCE_CLIP, Some(sets::STRUCTURAL_COMPONENT)),
    set("TimecodeComponent", sets::TIMECODE_COMPONENT, Some(sets::STRUCTURAL_COMPONENT)),
    set("GenericDescriptor", sets::GENERIC_DESCRIPTOR, Some(sets::INTERCHANGE_OBJECT)),
    set("FileDescriptor", sets::FILE_DESCRIPTOR, Some(sets::GENERIC_DESCRIPTOR)),
    set(
        "GenericPictureEssenceDescriptor",
        sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR,
        Some(sets::FILE_DESCRIPTOR),
    ),
    set(
        "CDCIEssenceDescriptor",
        sets::CDCI_ESSENCE_DESCRIPTOR,
        Some(sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR),
    ),
    set(
        "GenericSoundEssenceDescriptor",
        sets::GENERIC_SOUND_ESSENCE_DESCRIPTOR,
        Some(sets::FILE_DESCRIPTOR),
    ),
    set(
        "WaveAudioDescriptor",
        sets::WAVE_AUDIO_DESCRIPTOR,
        Some(sets::GENERIC_SOUND_ESSENCE_DESCRIPTOR),
    ),
    set("MultipleDescriptor", sets::MULTIPLE_DESCRIPTOR, Some(sets::FILE_DESCRIPTOR)),
    set("Locator", sets::LOCATOR, Some(sets::INTERCHANGE_OBJECT)),
    set("NetworkLocator", sets::NETWORK_LOCATOR, Some(sets::LOCATOR)),
    set("TapeDescriptor", sets::TAPE_DESCRIPTOR, Some(sets::GENERIC_DESCRIPTOR)),
    set("TaggedValue", sets::TAGGED_VALUE, Some(sets::INTERCHANGE_OBJECT)),
    set("Dictionary", sets::DICTIONARY, Some(sets::INTERCHANGE_OBJECT)),
];

static BASELINE_ITEMS: &[ItemDef] = &[
    // InterchangeObject
    item("InstanceUID", sets::INTERCHANGE_OBJECT, items::INSTANCE_UID, 0x3c0a, ItemType::Uuid, true),
    item("GenerationUID", sets::INTERCHANGE_OBJECT, items::GENERATION_UID, 0x0102, ItemType::Uuid, false),
    // Preface
    item("LastModifiedDate", sets::PREFACE, items::LAST_MODIFIED_DATE, 0x3b02, ItemType::Timestamp, true),
    item("Version", sets::PREFACE, items::VERSION, 0x3b05, ItemType::VersionType, true),
    item("ObjectModelVersion", sets::PREFACE, items::OBJECT_MODEL_VERSION, 0x3b07, ItemType::UInt32, false),
    item("PrimaryPackage", sets::PREFACE, items::PRIMARY_PACKAGE, 0x3b08, ItemType::WeakRef, false),
    item("Identifications", sets::PREFACE, items::IDENTIFICATIONS, 0x3b06, ItemType::StrongRefArray, true),
    item("ContentStorage", sets::PREFACE, items::CONTENT_STORAGE, 0x3b03, ItemType::StrongRef, true),
    item("OperationalPattern", sets::PREFACE, items::OPERATIONAL_PATTERN, 0x3b09, ItemType::Ul, true),
    item("EssenceContainers", sets::PREFACE, items::ESSENCE_CONTAINERS, 0x3b0a, ItemType::UlBatch, true),
    item("DMSchemes", sets::PREFACE, items::DM_SCHEMES, 0x3b0b, ItemType::UlBatch, true),
    item("ByteOrder", sets::PREFACE, items::BYTE_ORDER, 0x3b01, ItemType::Int16, false),
    item("Dictionary", sets::PREFACE, items::DICTIONARY, 0x3b04, ItemType::StrongRef, false),
    // Identification
    item("ThisGenerationUID", sets::IDENTIFICATION, items::THIS_GENERATION_UID, 0x3c09, ItemType::Uuid, true),
    item("CompanyName", sets::IDENTIFICATION, items::COMPANY_NAME, 0x3c01, ItemType::Utf16, true),
    item("ProductName", sets::IDENTIFICATION, items::PRODUCT_NAME, 0x3c02, ItemType::Utf16, true),
    item("ProductVersion", sets::IDENTIFICATION, items::PRODUCT_VERSION, 0x3c03, ItemType::ProductVersion, false),
    item("VersionString", sets::IDENTIFICATION, items::VERSION_STRING, 0x3c04, ItemType::Utf16, true),
    item("ProductUID", sets::IDENTIFICATION, items::PRODUCT_UID, 0x3c05, ItemType::Uuid, true),
    item("ModificationDate", sets::IDENTIFICATION, items::MODIFICATION_DATE, 0x3c06, ItemType::Timestamp, true),
    item("ToolkitVersion", sets::IDENTIFICATION, items::TOOLKIT_VERSION, 0x3c07, ItemType::ProductVersion, false),
    item("Platform", sets::IDENTIFICATION, items::PLATFORM, 0x3c08, ItemType::Utf16, false),
    // ContentStorage
    item("Packages", sets::CONTENT_STORAGE, items::PACKAGES, 0x1901, ItemType::StrongRefBatch, true),
    item("EssenceContainerData", sets::CONTENT_STORAGE, items::ESSENCE_CONTAINER_DATA, 0x1902, ItemType::StrongRefBatch, false),
    // EssenceContainerData
    item("LinkedPackageUID", sets::ESSENCE_CONTAINER_DATA, items::LINKED_PACKAGE_UID, 0x2701, ItemType::Umid, true),
    item("IndexSID", sets::ESSENCE_CONTAINER_DATA, items::INDEX_SID, 0x3f06, ItemType::UInt32, false),
    item("BodySID", sets::ESSENCE_CONTAINER_DATA, items::BODY_SID, 0x3f07, ItemType::UInt32, true),
    // GenericPackage
    item("PackageUID", sets::GENERIC_PACKAGE, items::PACKAGE_UID, 0x4401, ItemType::Umid, true),
    item("Name", sets::GENERIC_PACKAGE, items::PACKAGE_NAME, 0x4402, ItemType::Utf16, false),
    item("PackageCreationDate", sets::GENERIC_PACKAGE, items::PACKAGE_CREATION_DATE, 0x4405, ItemType::Timestamp, true),
    item("PackageModifiedDate", sets::GENERIC_PACKAGE, items::PACKAGE_MODIFIED_DATE, 0x4404, ItemType::Timestamp, true),
    item("Tracks", sets::GENERIC_PACKAGE, items::TRACKS, 0x4403, ItemType::StrongRefArray, true),
    // SourcePackage
    item("Descriptor", sets::SOURCE_PACKAGE, items::DESCRIPTOR, 0x4701, ItemType::StrongRef, false),
    // GenericTrack
    item("TrackID", sets::GENERIC_TRACK, items::TRACK_ID, 0x4801, ItemType::UInt32, true),
    item("TrackNumber", sets::GENERIC_TRACK, items::TRACK_NUMBER, 0x4804, ItemType::UInt32, true),
    item("TrackName", sets::GENERIC_TRACK, items::TRACK_NAME, 0x4802, ItemType::Utf16, false),
    item("Sequence", sets::GENERIC_TRACK, items::SEQUENCE, 0x4803, ItemType::StrongRef, true),
    // Track
    item("EditRate", sets::TRACK, items::EDIT_RATE, 0x4b01, ItemType::Rational, true),
    item("Origin", sets::TRACK, items::ORIGIN, 0x4b02, ItemType::Int64, true),
    // StructuralComponent
    item("DataDefinition", sets::STRUCTURAL_COMPONENT, items::DATA_DEFINITION, 0x0201, ItemType::Ul, true),
    item("Duration", sets::STRUCTURAL_COMPONENT, items::DURATION, 0x0202, ItemType::Int64, false),
    // Sequence
    item("StructuralComponents", sets::SEQUENCE, items::STRUCTURAL_COMPONENTS, 0x1001, ItemType::StrongRefArray, true),
    // SourceClip
    item("StartPosition", sets::SOURCE_CLIP, items::START_POSITION, 0x1201, ItemType::Int64, true),
    item("SourcePackageID", sets::SOURCE_CLIP, items::SOURCE_PACKAGE_ID, 0x1101, ItemType::Umid, true),
    item("SourceTrackID", sets::SOURCE_CLIP, items::SOURCE_TRACK_ID, 0x1102, ItemType::UInt32, true),
    // TimecodeComponent
    item("RoundedTimecodeBase", sets::TIMECODE_COMPONENT, items::ROUNDED_TIMECODE_BASE, 0x1502, ItemType::UInt16, true),
    item("StartTimecode", sets::TIMECODE_COMPONENT, items::START_TIMECODE, 0x1501, ItemType::Int64, true),
    item("DropFrame", sets::TIMECODE_COMPONENT, items::DROP_FRAME, 0x1503, ItemType::Boolean, true),
    // GenericDescriptor
    item("Locators", sets::GENERIC_DESCRIPTOR, items::LOCATORS, 0x2f01, ItemType::StrongRefArray, false),
    // FileDescriptor
    item("LinkedTrackID", sets::FILE_DESCRIPTOR, items::LINKED_TRACK_ID, 0x3006, ItemType::UInt32, false),
    item("SampleRate", sets::FILE_DESCRIPTOR, items::SAMPLE_RATE, 0x3001, ItemType::Rational, true),
    item("ContainerDuration", sets::FILE_DESCRIPTOR, items::CONTAINER_DURATION, 0x3002, ItemType::Int64, false),
    item("EssenceContainer", sets::FILE_DESCRIPTOR, items::ESSENCE_CONTAINER, 0x3004, ItemType::Ul, true),
    item("Codec", sets::FILE_DESCRIPTOR, items::CODEC, 0x3005, ItemType::Ul, false),
    // GenericPictureEssenceDescriptor
    item("SignalStandard", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::SIGNAL_STANDARD, 0x3215, ItemType::UInt8, false),
    item("FrameLayout", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::FRAME_LAYOUT, 0x320c, ItemType::UInt8, false),
    item("StoredWidth", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::STORED_WIDTH, 0x3203, ItemType::UInt32, false),
    item("StoredHeight", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::STORED_HEIGHT, 0x3202, ItemType::UInt32, false),
    item("DisplayHeight", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::DISPLAY_HEIGHT, 0x3208, ItemType::UInt32, false),
    item("DisplayWidth", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::DISPLAY_WIDTH, 0x3209, ItemType::UInt32, false),
    item("DisplayXOffset", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::DISPLAY_X_OFFSET, 0x320b, ItemType::Int32, false),
    item("DisplayYOffset", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::DISPLAY_Y_OFFSET, 0x320a, ItemType::Int32, false),
    item("AspectRatio", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::ASPECT_RATIO, 0x320e, ItemType::Rational, false),
    item("VideoLineMap", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::VIDEO_LINE_MAP, 0x320d, ItemType::Int32Array, false),
    item("ImageAlignmentOffset", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::IMAGE_ALIGNMENT_OFFSET, 0x3211, ItemType::UInt32, false),
    item("ImageStartOffset", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::IMAGE_START_OFFSET, 0x3213, ItemType::UInt32, false),
    item("PictureEssenceCoding", sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, items::PICTURE_ESSENCE_CODING, 0x3201, ItemType::Ul, false),
    // CDCIEssenceDescriptor
    item("ComponentDepth", sets::CDCI_ESSENCE_DESCRIPTOR, items::COMPONENT_DEPTH, 0x3301, ItemType::UInt32, false),
    item("HorizontalSubsampling", sets::CDCI_ESSENCE_DESCRIPTOR, items::HORIZONTAL_SUBSAMPLING, 0x3302, ItemType::UInt32, false),
    item("VerticalSubsampling", sets::CDCI_ESSENCE_DESCRIPTOR, items::VERTICAL_SUBSAMPLING, 0x3308, ItemType::UInt32, false),
    item("ColorSiting", sets::CDCI_ESSENCE_DESCRIPTOR, items::COLOR_SITING, 0x3303, ItemType::UInt8, false),
    item("BlackRefLevel", sets::CDCI_ESSENCE_DESCRIPTOR, items::BLACK_REF_LEVEL, 0x3304, ItemType::UInt32, false),
    item("WhiteRefLevel", sets::CDCI_ESSENCE_DESCRIPTOR, items::WHITE_REF_LEVEL, 0x3305, ItemType::UInt32, false),
    item("ColorRange", sets::CDCI_ESSENCE_DESCRIPTOR, items::COLOR_RANGE, 0x3306, ItemType::UInt32, false),
    // GenericSoundEssenceDescriptor
    item("AudioSamplingRate", sets::GENERIC_SOUND_ESSENCE_DESCRIPTOR, items::AUDIO_SAMPLING_RATE, 0x3d03, ItemType::Rational, false),
    item("Locked", sets::GENERIC_SOUND_ESSENCE_DESCRIPTOR, items::LOCKED, 0x3d02, ItemType::Boolean, false),
    item("ChannelCount", sets::GENERIC_SOUND_ESSENCE_DESCRIPTOR, items::CHANNEL_COUNT, 0x3d07, ItemType::UInt32, false),
    item("QuantizationBits", sets::GENERIC_SOUND_ESSENCE_DESCRIPTOR, items::QUANTIZATION_BITS, 0x3d01, ItemType::UInt32, false),
    // WaveAudioDescriptor
    item("BlockAlign", sets::WAVE_AUDIO_DESCRIPTOR, items::BLOCK_ALIGN, 0x3d0a, ItemType::UInt16, true),
    item("SequenceOffset", sets::WAVE_AUDIO_DESCRIPTOR, items::SEQUENCE_OFFSET, 0x3d0b, ItemType::UInt8, false),
    item("AvgBps", sets::WAVE_AUDIO_DESCRIPTOR, items::AVG_BPS, 0x3d09, ItemType::UInt32, true),
    // MultipleDescriptor
    item("SubDescriptorUIDs", sets::MULTIPLE_DESCRIPTOR, items::SUB_DESCRIPTOR_UIDS, 0x3f01, ItemType::StrongRefArray, true),
    // NetworkLocator
    item("URLString", sets::NETWORK_LOCATOR, items::URL_STRING, 0x4001, ItemType::Utf16, true),
    // TaggedValue
    item("Name", sets::TAGGED_VALUE, items::TAGGED_VALUE_NAME, 0x5001, ItemType::Utf16, true),
    item("Value", sets::TAGGED_VALUE, items::TAGGED_VALUE_VALUE, 0x5003, ItemType::Indirect, true),
];

/// Baseline SMPTE set definitions in registration order (parents first).
pub fn baseline_set_defs() -> &'static [SetDef] {
    BASELINE_SETS
}

/// Baseline SMPTE item definitions.
pub fn baseline_item_defs() -> &'static [ItemDef] {
    BASELINE_ITEMS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn set_keys_are_unique() {
        let mut seen = HashSet::new();
        for def in baseline_set_defs() {
            assert!(seen.insert(def.key), "duplicate set key for {}", def.name);
        }
    }

    #[test]
    fn item_keys_and_tags_are_unique() {
        let mut keys = HashSet::new();
        let mut tags = HashSet::new();
        for def in baseline_item_defs() {
            assert!(keys.insert(def.key), "duplicate item key for {}", def.name);
            if def.tag != DYNAMIC_TAG {
                assert!(tags.insert(def.tag), "duplicate tag 0x{:04x} for {}", def.tag, def.name);
            }
        }
    }

    #[test]
    fn parents_are_registered() {
        let keys: HashSet<_> = baseline_set_defs().iter().map(|d| d.key).collect();
        for def in baseline_set_defs() {
            if let Some(parent) = def.parent {
                assert!(keys.contains(&parent), "missing parent of {}", def.name);
            }
        }
        for def in baseline_item_defs() {
            assert!(keys.contains(&def.set_key), "missing set of {}", def.name);
        }
    }
}
