//! Archive MXF writer.
//!
//! The file layout is one header partition (pack, header metadata padded
//! to a fixed absolute offset, index table segment), the frame-wrapped
//! essence, a footer partition and the RIP. `complete()` patches the
//! durations, re-writes the header metadata and index in place and
//! back-patches every partition pack.

use std::io::{Seek, Write};

use mxftool_core::{
    convert_position, IndexTableSegment, Key, PartitionKind, PartitionStatus, Rational, Timestamp,
    Umid, KEY_SIZE, RATE_25, RATE_48K,
};
use mxftool_file::MxfFile;
use mxftool_labels::{archive, datadef, essence, items, op, sets, DYNAMIC_TAG};
use mxftool_meta::{DataModel, HeaderMetadata, MetaValue, SetId};
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result, Timecode, MAX_CP_AUDIO_TRACKS, SYSTEM_ITEM_SIZE};

const MIN_LLEN: u8 = 4;

const BODY_SID: u32 = 1;
const INDEX_SID: u32 = 2;

const AUDIO_SAMPLE_RATE: Rational = RATE_48K;
const AUDIO_EDIT_RATE: Rational = RATE_25;
const AUDIO_QUANT_BITS: u32 = 20;
const AUDIO_BLOCK_ALIGN: u16 = 3;
const AUDIO_FRAME_SIZE: u32 = 1920 * 3;

const VIDEO_SAMPLE_RATE: Rational = RATE_25;
const VIDEO_EDIT_RATE: Rational = RATE_25;
const VIDEO_FRAME_LAYOUT_MIXED_FIELDS: u8 = 3;
/// For mixed fields the stored height is the frame height.
const VIDEO_STORED_HEIGHT: u32 = 576;
const VIDEO_STORED_WIDTH: u32 = 720;
const VIDEO_LINE_MAP: [i32; 2] = [23, 336];
const VIDEO_ASPECT_RATIO: Rational = Rational::new(4, 3);
const VIDEO_COMPONENT_DEPTH: u32 = 8;
const VIDEO_HORIZONTAL_SUBSAMPLING: u32 = 2;
const VIDEO_VERTICAL_SUBSAMPLING: u32 = 1;
/// W x H x (Y + Cr/2 + Cb/2)
const VIDEO_FRAME_SIZE: u32 = 720 * 576 * 2;

const TAPE_LEN: i64 = 120 * 25 * 60 * 60;
const NUM_TAPE_AUDIO_TRACKS: usize = MAX_CP_AUDIO_TRACKS;

/// Absolute offset the header metadata plus index table are padded to,
/// reserving rewrite slack.
const FIXED_BODY_OFFSET: u64 = 0x8000;

const IDENT_PRODUCT_UID: [u8; 16] = [
    0x8c, 0x6b, 0x0e, 0xc8, 0xab, 0x70, 0x4a, 0x23, 0x9d, 0x62, 0x81, 0x63, 0x83, 0xc3, 0x74, 0x1e,
];
const IDENT_COMPANY_NAME: &str = "mxftool";
const IDENT_PRODUCT_NAME: &str = "Archive MXF Writer";
const IDENT_VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

/// Register the D3 preservation extension items on a not-yet-finalized
/// model.
pub fn register_archive_extensions(model: &mut DataModel) -> mxftool_meta::Result<()> {
    model.register_item_def(
        "D3ErrorCount",
        &sets::PREFACE,
        &archive::D3_ERROR_COUNT,
        DYNAMIC_TAG,
        mxftool_core::ItemType::UInt32,
        false,
    )?;
    model.register_item_def(
        "PSEFailureCount",
        &sets::PREFACE,
        &archive::PSE_FAILURE_COUNT,
        DYNAMIC_TAG,
        mxftool_core::ItemType::UInt32,
        false,
    )?;
    Ok(())
}

/// Entities whose duration is stamped on completion, each in its native
/// edit rate.
enum DurationUpdate {
    Component { id: SetId, edit_rate: Rational },
    Descriptor(SetId),
}

/// Writer for frame-wrapped archive files.
///
/// Calls must follow the content-package order: `write_timecode`,
/// `write_video_frame`, then one `write_audio_frame` per audio track.
/// Out-of-order calls are programming errors and panic.
#[must_use]
pub struct ArchiveWriter<S> {
    file: MxfFile<S>,
    metadata: HeaderMetadata,
    index: IndexTableSegment,
    audio_element_keys: Vec<Key>,
    num_audio_tracks: usize,
    duration: i64,
    header_metadata_start: u64,
    updates: Vec<DurationUpdate>,
    write_state: usize,
    is_complete: bool,
}

fn track_name(prefix: &str, number: usize) -> String {
    format!("{prefix}{number}")
}

impl<S: Write + Seek> ArchiveWriter<S> {
    /// Start a new archive file on `stream`. `url` is recorded in the
    /// network locator; `start_position` is the edit-unit offset of this
    /// file within the source tape.
    pub fn new(
        stream: S,
        url: &str,
        num_audio_tracks: usize,
        start_position: i64,
    ) -> Result<Self> {
        if num_audio_tracks > MAX_CP_AUDIO_TRACKS {
            return Err(Error::TooManyAudioTracks {
                have: num_audio_tracks,
                max: MAX_CP_AUDIO_TRACKS,
            });
        }

        let now = Timestamp::now();
        let tape_package_uid = Umid::generate();
        let file_package_uid = Umid::generate();
        let material_package_uid = Umid::generate();
        let audio_element_keys: Vec<Key> = (0..num_audio_tracks)
            .map(|i| essence::archive_audio_element_key(num_audio_tracks as u8, i as u8))
            .collect();

        let mut file = MxfFile::new(stream);
        file.stream().set_min_llen(MIN_LLEN)?;

        // header partition pack
        let header = file.create_partition(PartitionKind::Header, PartitionStatus::ClosedComplete);
        {
            let partition = file.partition_mut(header);
            partition.body_sid = BODY_SID;
            partition.index_sid = INDEX_SID;
            partition.operational_pattern = op::OP_1A_MULTI_TRACK_STREAM_INTERNAL;
            partition.add_essence_container(essence::MULTIPLE_WRAPPINGS);
            partition.add_essence_container(essence::SD_UNC_625_50I_422_135_FRAME_WRAPPED);
            partition.add_essence_container(essence::BWF_FRAME_WRAPPED);
        }
        file.write_partition(header)?;

        // header metadata
        let mut model = DataModel::baseline();
        register_archive_extensions(&mut model)?;
        model.finalize()?;
        let mut md = HeaderMetadata::new(model)?;
        let mut updates = Vec::new();

        // Preface
        let preface = md.create(&sets::PREFACE)?;
        {
            let set = md.set_mut(preface);
            set.set_timestamp_item(&items::LAST_MODIFIED_DATE, now);
            set.set_version_item(&items::VERSION, 0x0102);
            set.set_ul_item(
                &items::OPERATIONAL_PATTERN,
                op::OP_1A_MULTI_TRACK_STREAM_INTERNAL,
            );
            if num_audio_tracks > 0 {
                set.append_ul_item(&items::ESSENCE_CONTAINERS, essence::MULTIPLE_WRAPPINGS);
                set.append_ul_item(
                    &items::ESSENCE_CONTAINERS,
                    essence::SD_UNC_625_50I_422_135_FRAME_WRAPPED,
                );
                set.append_ul_item(&items::ESSENCE_CONTAINERS, essence::BWF_FRAME_WRAPPED);
            } else {
                set.append_ul_item(
                    &items::ESSENCE_CONTAINERS,
                    essence::SD_UNC_625_50I_422_135_FRAME_WRAPPED,
                );
            }
            set.append_ul_item(&items::DM_SCHEMES, datadef::D3_PRESERVATION_SCHEME);
            set.set_uint32_item(&archive::D3_ERROR_COUNT, 0);
            set.set_uint32_item(&archive::PSE_FAILURE_COUNT, 0);
        }

        // Preface - Identification
        let ident = md.create(&sets::IDENTIFICATION)?;
        md.set_mut(preface).append_ref_item(&items::IDENTIFICATIONS, ident.0);
        {
            let set = md.set_mut(ident);
            set.set_uuid_item(&items::THIS_GENERATION_UID, Uuid::new_v4());
            set.set_string_item(&items::COMPANY_NAME, IDENT_COMPANY_NAME);
            set.set_string_item(&items::PRODUCT_NAME, IDENT_PRODUCT_NAME);
            set.set_string_item(&items::VERSION_STRING, IDENT_VERSION_STRING);
            set.set_uuid_item(&items::PRODUCT_UID, Uuid::from_bytes(IDENT_PRODUCT_UID));
            set.set_timestamp_item(&items::MODIFICATION_DATE, now);
        }

        // Preface - ContentStorage
        let content = md.create(&sets::CONTENT_STORAGE)?;
        md.set_mut(preface).set_ref_item(&items::CONTENT_STORAGE, content.0);

        // Preface - ContentStorage - EssenceContainerData
        let ess_data = md.create(&sets::ESSENCE_CONTAINER_DATA)?;
        md.set_mut(content).append_ref_item(&items::ESSENCE_CONTAINER_DATA, ess_data.0);
        {
            let set = md.set_mut(ess_data);
            set.set_umid_item(&items::LINKED_PACKAGE_UID, file_package_uid);
            set.set_uint32_item(&items::INDEX_SID, INDEX_SID);
            set.set_uint32_item(&items::BODY_SID, BODY_SID);
        }

        // Preface - ContentStorage - MaterialPackage
        let material = md.create(&sets::MATERIAL_PACKAGE)?;
        md.set_mut(content).append_ref_item(&items::PACKAGES, material.0);
        {
            let set = md.set_mut(material);
            set.set_umid_item(&items::PACKAGE_UID, material_package_uid);
            set.set_timestamp_item(&items::PACKAGE_CREATION_DATE, now);
            set.set_timestamp_item(&items::PACKAGE_MODIFIED_DATE, now);
            set.set_string_item(&items::PACKAGE_NAME, "D3 material");
        }

        // material package timecode track
        let tc_track = md.create(&sets::TRACK)?;
        md.set_mut(material).append_ref_item(&items::TRACKS, tc_track.0);
        {
            let set = md.set_mut(tc_track);
            set.set_string_item(&items::TRACK_NAME, "TC1");
            set.set_uint32_item(&items::TRACK_ID, 1);
            set.set_uint32_item(&items::TRACK_NUMBER, 0);
            set.set_rational_item(&items::EDIT_RATE, VIDEO_EDIT_RATE);
            set.set_int64_item(&items::ORIGIN, 0);
        }
        let tc_component = md.create(&sets::TIMECODE_COMPONENT)?;
        md.set_mut(tc_track).set_ref_item(&items::SEQUENCE, tc_component.0);
        {
            let set = md.set_mut(tc_component);
            set.set_ul_item(&items::DATA_DEFINITION, datadef::TIMECODE);
            set.set_int64_item(&items::DURATION, -1); // updated on complete
            set.set_uint16_item(&items::ROUNDED_TIMECODE_BASE, 25);
            set.set_boolean_item(&items::DROP_FRAME, false);
            set.set_int64_item(&items::START_TIMECODE, 0);
        }
        updates.push(DurationUpdate::Component {
            id: tc_component,
            edit_rate: VIDEO_EDIT_RATE,
        });

        // material package timeline tracks: video then audio
        for i in 0..num_audio_tracks + 1 {
            let is_picture = i == 0;
            let edit_rate = if is_picture { VIDEO_EDIT_RATE } else { AUDIO_EDIT_RATE };
            let data_def = if is_picture { datadef::PICTURE } else { datadef::SOUND };

            let track = md.create(&sets::TRACK)?;
            md.set_mut(material).append_ref_item(&items::TRACKS, track.0);
            {
                let set = md.set_mut(track);
                let name = if is_picture {
                    "V1".to_owned()
                } else {
                    track_name("A", i)
                };
                set.set_string_item(&items::TRACK_NAME, &name);
                set.set_uint32_item(&items::TRACK_ID, (i + 2) as u32);
                set.set_uint32_item(&items::TRACK_NUMBER, 0);
                set.set_rational_item(&items::EDIT_RATE, edit_rate);
                set.set_int64_item(&items::ORIGIN, 0);
            }

            let sequence = md.create(&sets::SEQUENCE)?;
            md.set_mut(track).set_ref_item(&items::SEQUENCE, sequence.0);
            {
                let set = md.set_mut(sequence);
                set.set_ul_item(&items::DATA_DEFINITION, data_def);
                set.set_int64_item(&items::DURATION, -1);
            }
            updates.push(DurationUpdate::Component {
                id: sequence,
                edit_rate,
            });

            let clip = md.create(&sets::SOURCE_CLIP)?;
            md.set_mut(sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, clip.0);
            {
                let set = md.set_mut(clip);
                set.set_ul_item(&items::DATA_DEFINITION, data_def);
                set.set_int64_item(&items::DURATION, -1);
                set.set_int64_item(&items::START_POSITION, 0);
                set.set_uint32_item(&items::SOURCE_TRACK_ID, (i + 1) as u32);
                set.set_umid_item(&items::SOURCE_PACKAGE_ID, file_package_uid);
            }
            updates.push(DurationUpdate::Component {
                id: clip,
                edit_rate,
            });
        }

        // Preface - ContentStorage - file SourcePackage
        let file_package = md.create(&sets::SOURCE_PACKAGE)?;
        md.set_mut(content).append_ref_item(&items::PACKAGES, file_package.0);
        {
            let set = md.set_mut(file_package);
            set.set_umid_item(&items::PACKAGE_UID, file_package_uid);
            set.set_timestamp_item(&items::PACKAGE_CREATION_DATE, now);
            set.set_timestamp_item(&items::PACKAGE_MODIFIED_DATE, now);
        }

        for i in 0..num_audio_tracks + 1 {
            let is_picture = i == 0;
            let edit_rate = if is_picture { VIDEO_EDIT_RATE } else { AUDIO_EDIT_RATE };
            let data_def = if is_picture { datadef::PICTURE } else { datadef::SOUND };

            let track = md.create(&sets::TRACK)?;
            md.set_mut(file_package).append_ref_item(&items::TRACKS, track.0);
            {
                let set = md.set_mut(track);
                let name = if is_picture {
                    "V1".to_owned()
                } else {
                    track_name("A", i)
                };
                set.set_string_item(&items::TRACK_NAME, &name);
                set.set_uint32_item(&items::TRACK_ID, (i + 1) as u32);
                let track_num = if is_picture {
                    essence::track_number(
                        essence::PICTURE_ITEM_TYPE,
                        1,
                        essence::UNC_FRAME_WRAPPED_EE_TYPE,
                        1,
                    )
                } else {
                    essence::track_number(
                        essence::SOUND_ITEM_TYPE,
                        num_audio_tracks as u8,
                        essence::BWF_FRAME_WRAPPED_EE_TYPE,
                        i as u8,
                    )
                };
                set.set_uint32_item(&items::TRACK_NUMBER, track_num);
                set.set_rational_item(&items::EDIT_RATE, edit_rate);
                set.set_int64_item(&items::ORIGIN, 0);
            }

            let sequence = md.create(&sets::SEQUENCE)?;
            md.set_mut(track).set_ref_item(&items::SEQUENCE, sequence.0);
            {
                let set = md.set_mut(sequence);
                set.set_ul_item(&items::DATA_DEFINITION, data_def);
                set.set_int64_item(&items::DURATION, -1);
            }
            updates.push(DurationUpdate::Component {
                id: sequence,
                edit_rate,
            });

            let clip = md.create(&sets::SOURCE_CLIP)?;
            md.set_mut(sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, clip.0);
            {
                let set = md.set_mut(clip);
                set.set_ul_item(&items::DATA_DEFINITION, data_def);
                set.set_int64_item(&items::DURATION, -1);
                set.set_int64_item(
                    &items::START_POSITION,
                    convert_position(start_position, VIDEO_EDIT_RATE, edit_rate),
                );
                set.set_uint32_item(&items::SOURCE_TRACK_ID, (i + 1) as u32);
                set.set_umid_item(&items::SOURCE_PACKAGE_ID, tape_package_uid);
            }
            updates.push(DurationUpdate::Component {
                id: clip,
                edit_rate,
            });
        }

        // file SourcePackage - MultipleDescriptor
        let mult_descriptor = md.create(&sets::MULTIPLE_DESCRIPTOR)?;
        md.set_mut(file_package).set_ref_item(&items::DESCRIPTOR, mult_descriptor.0);
        {
            let set = md.set_mut(mult_descriptor);
            set.set_rational_item(&items::SAMPLE_RATE, VIDEO_SAMPLE_RATE);
            set.set_ul_item(&items::ESSENCE_CONTAINER, essence::MULTIPLE_WRAPPINGS);
            set.set_item(&items::SUB_DESCRIPTOR_UIDS, MetaValue::RefVec(Vec::new()));
        }
        updates.push(DurationUpdate::Descriptor(mult_descriptor));

        // MultipleDescriptor - NetworkLocator
        let locator = md.create(&sets::NETWORK_LOCATOR)?;
        md.set_mut(mult_descriptor).append_ref_item(&items::LOCATORS, locator.0);
        md.set_mut(locator).set_string_item(&items::URL_STRING, url);

        // MultipleDescriptor - CDCIEssenceDescriptor
        let cdci = md.create(&sets::CDCI_ESSENCE_DESCRIPTOR)?;
        md.set_mut(mult_descriptor).append_ref_item(&items::SUB_DESCRIPTOR_UIDS, cdci.0);
        {
            let set = md.set_mut(cdci);
            set.set_uint32_item(&items::LINKED_TRACK_ID, 1);
            set.set_rational_item(&items::SAMPLE_RATE, VIDEO_SAMPLE_RATE);
            set.set_ul_item(
                &items::ESSENCE_CONTAINER,
                essence::SD_UNC_625_50I_422_135_FRAME_WRAPPED,
            );
            set.set_uint8_item(&items::FRAME_LAYOUT, VIDEO_FRAME_LAYOUT_MIXED_FIELDS);
            set.set_uint32_item(&items::STORED_HEIGHT, VIDEO_STORED_HEIGHT);
            set.set_uint32_item(&items::STORED_WIDTH, VIDEO_STORED_WIDTH);
            set.append_int32_item(&items::VIDEO_LINE_MAP, VIDEO_LINE_MAP[0]);
            set.append_int32_item(&items::VIDEO_LINE_MAP, VIDEO_LINE_MAP[1]);
            set.set_rational_item(&items::ASPECT_RATIO, VIDEO_ASPECT_RATIO);
            set.set_uint32_item(&items::COMPONENT_DEPTH, VIDEO_COMPONENT_DEPTH);
            set.set_uint32_item(&items::HORIZONTAL_SUBSAMPLING, VIDEO_HORIZONTAL_SUBSAMPLING);
            set.set_uint32_item(&items::VERTICAL_SUBSAMPLING, VIDEO_VERTICAL_SUBSAMPLING);
        }
        updates.push(DurationUpdate::Descriptor(cdci));

        // MultipleDescriptor - WaveAudioDescriptor per audio track
        for i in 0..num_audio_tracks {
            let wave = md.create(&sets::WAVE_AUDIO_DESCRIPTOR)?;
            md.set_mut(mult_descriptor).append_ref_item(&items::SUB_DESCRIPTOR_UIDS, wave.0);
            {
                let set = md.set_mut(wave);
                set.set_uint32_item(&items::LINKED_TRACK_ID, (i + 2) as u32);
                set.set_rational_item(&items::SAMPLE_RATE, AUDIO_EDIT_RATE);
                set.set_ul_item(&items::ESSENCE_CONTAINER, essence::BWF_FRAME_WRAPPED);
                set.set_rational_item(&items::AUDIO_SAMPLING_RATE, AUDIO_SAMPLE_RATE);
                set.set_boolean_item(&items::LOCKED, true);
                set.set_uint32_item(&items::CHANNEL_COUNT, 1);
                set.set_uint32_item(&items::QUANTIZATION_BITS, AUDIO_QUANT_BITS);
                set.set_uint16_item(&items::BLOCK_ALIGN, AUDIO_BLOCK_ALIGN);
                set.set_uint32_item(&items::AVG_BPS, avg_bps(AUDIO_SAMPLE_RATE, 1, AUDIO_QUANT_BITS));
            }
            updates.push(DurationUpdate::Descriptor(wave));
        }

        // Preface - ContentStorage - tape SourcePackage
        let tape_package = md.create(&sets::SOURCE_PACKAGE)?;
        md.set_mut(content).append_ref_item(&items::PACKAGES, tape_package.0);
        {
            let set = md.set_mut(tape_package);
            set.set_umid_item(&items::PACKAGE_UID, tape_package_uid);
            set.set_timestamp_item(&items::PACKAGE_CREATION_DATE, now);
            set.set_timestamp_item(&items::PACKAGE_MODIFIED_DATE, now);
            set.set_string_item(&items::PACKAGE_NAME, "D3 tape");
        }

        for i in 0..NUM_TAPE_AUDIO_TRACKS + 1 {
            let is_picture = i == 0;
            let edit_rate = if is_picture { VIDEO_EDIT_RATE } else { AUDIO_EDIT_RATE };
            let data_def = if is_picture { datadef::PICTURE } else { datadef::SOUND };

            let track = md.create(&sets::TRACK)?;
            md.set_mut(tape_package).append_ref_item(&items::TRACKS, track.0);
            {
                let set = md.set_mut(track);
                let name = if is_picture {
                    "V1".to_owned()
                } else {
                    track_name("A", i)
                };
                set.set_string_item(&items::TRACK_NAME, &name);
                set.set_uint32_item(&items::TRACK_ID, (i + 1) as u32);
                set.set_uint32_item(&items::TRACK_NUMBER, 0);
                set.set_rational_item(&items::EDIT_RATE, edit_rate);
                set.set_int64_item(&items::ORIGIN, 0);
            }

            let sequence = md.create(&sets::SEQUENCE)?;
            md.set_mut(track).set_ref_item(&items::SEQUENCE, sequence.0);
            {
                let set = md.set_mut(sequence);
                set.set_ul_item(&items::DATA_DEFINITION, data_def);
                set.set_int64_item(&items::DURATION, TAPE_LEN);
            }

            let clip = md.create(&sets::SOURCE_CLIP)?;
            md.set_mut(sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, clip.0);
            {
                let set = md.set_mut(clip);
                set.set_ul_item(&items::DATA_DEFINITION, data_def);
                set.set_int64_item(&items::DURATION, TAPE_LEN);
                set.set_int64_item(
                    &items::START_POSITION,
                    convert_position(start_position, VIDEO_EDIT_RATE, edit_rate),
                );
                set.set_uint32_item(&items::SOURCE_TRACK_ID, 0);
                set.set_umid_item(&items::SOURCE_PACKAGE_ID, Umid::null());
            }
        }

        // tape SourcePackage timecode track
        let tape_tc_track = md.create(&sets::TRACK)?;
        md.set_mut(tape_package).append_ref_item(&items::TRACKS, tape_tc_track.0);
        {
            let set = md.set_mut(tape_tc_track);
            set.set_string_item(&items::TRACK_NAME, "TC1");
            set.set_uint32_item(&items::TRACK_ID, (NUM_TAPE_AUDIO_TRACKS + 2) as u32);
            set.set_uint32_item(&items::TRACK_NUMBER, 0);
            set.set_rational_item(&items::EDIT_RATE, VIDEO_EDIT_RATE);
            set.set_int64_item(&items::ORIGIN, 0);
        }
        let tape_tc_sequence = md.create(&sets::SEQUENCE)?;
        md.set_mut(tape_tc_track).set_ref_item(&items::SEQUENCE, tape_tc_sequence.0);
        {
            let set = md.set_mut(tape_tc_sequence);
            set.set_ul_item(&items::DATA_DEFINITION, datadef::TIMECODE);
            set.set_int64_item(&items::DURATION, TAPE_LEN);
        }
        let tape_tc = md.create(&sets::TIMECODE_COMPONENT)?;
        md.set_mut(tape_tc_sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, tape_tc.0);
        {
            let set = md.set_mut(tape_tc);
            set.set_ul_item(&items::DATA_DEFINITION, datadef::TIMECODE);
            set.set_int64_item(&items::DURATION, TAPE_LEN);
            set.set_uint16_item(&items::ROUNDED_TIMECODE_BASE, 25);
            set.set_boolean_item(&items::DROP_FRAME, false);
            set.set_int64_item(&items::START_TIMECODE, 0);
        }

        // tape SourcePackage - TapeDescriptor
        let tape_descriptor = md.create(&sets::TAPE_DESCRIPTOR)?;
        md.set_mut(tape_package).set_ref_item(&items::DESCRIPTOR, tape_descriptor.0);

        // write the header metadata; the position is needed for the
        // in-place rewrite on completion
        let header_metadata_start = file.stream().position()?;
        file.write_header_metadata(&md, 0, None)?;

        // index table segment with one delta entry per content package
        // element, padded to the fixed body offset
        let mut index = IndexTableSegment::new();
        index.index_edit_rate = VIDEO_EDIT_RATE;
        index.index_duration = 0; // updated on complete
        index.index_sid = INDEX_SID;
        index.body_sid = BODY_SID;
        let mut delta = 0u32;
        index.append_delta_entry(0, 0, delta); // system item
        delta += KEY_SIZE as u32 + 4 + SYSTEM_ITEM_SIZE;
        index.append_delta_entry(0, 0, delta); // video item
        delta += KEY_SIZE as u32 + 4 + VIDEO_FRAME_SIZE;
        for _ in 0..num_audio_tracks {
            index.append_delta_entry(0, 0, delta); // audio item
            delta += KEY_SIZE as u32 + 4 + AUDIO_FRAME_SIZE;
        }
        index.edit_unit_byte_count = delta;
        file.write_index_segment(&index, 0, Some(FIXED_BODY_OFFSET))?;

        debug!(num_audio_tracks, "created archive writer");
        Ok(ArchiveWriter {
            file,
            metadata: md,
            index,
            audio_element_keys,
            num_audio_tracks,
            duration: 0,
            header_metadata_start,
            updates,
            write_state: 0,
            is_complete: false,
        })
    }

    pub fn num_audio_tracks(&self) -> usize {
        self.num_audio_tracks
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// Fixed content-package size implied by the element sizes.
    pub fn edit_unit_byte_count(&self) -> u32 {
        self.index.edit_unit_byte_count
    }

    /// Write the system item carrying the VITC and LTC timecodes. Starts a
    /// content package.
    pub fn write_timecode(&mut self, vitc: Timecode, ltc: Timecode) -> Result<()> {
        assert!(!self.is_complete, "writer is complete");
        assert_eq!(self.write_state, 0, "timecode written out of order");

        let stream = self.file.stream();
        stream.write_fixed_kl(&essence::SYSTEM_ITEM_ELEMENT, 4, u64::from(SYSTEM_ITEM_SIZE))?;
        stream.write_u16(0x0102)?; // local tag
        stream.write_u16(SYSTEM_ITEM_SIZE as u16 - 4)?;
        stream.write_array_header(2, 8)?; // VITC and LTC SMPTE-12M timecodes
        stream.write_all_bytes(&vitc.to_12m())?;
        stream.write_all_bytes(&ltc.to_12m())?;

        self.write_state = 1; // video next
        Ok(())
    }

    /// Write one video frame.
    pub fn write_video_frame(&mut self, data: &[u8]) -> Result<()> {
        assert!(!self.is_complete, "writer is complete");
        assert_eq!(self.write_state, 1, "video frame written out of order");

        let stream = self.file.stream();
        stream.write_fixed_kl(&essence::archive_video_element_key(), 4, data.len() as u64)?;
        stream.write_all_bytes(data)?;

        if self.num_audio_tracks > 0 {
            self.write_state = 2; // audio 1 next
        } else {
            self.duration += 1; // content package is complete
            self.write_state = 0;
        }
        Ok(())
    }

    /// Write the next audio frame of the current content package.
    pub fn write_audio_frame(&mut self, data: &[u8]) -> Result<()> {
        assert!(!self.is_complete, "writer is complete");
        assert!(
            self.write_state >= 2 && self.write_state <= self.num_audio_tracks + 1,
            "audio frame written out of order"
        );

        let key = self.audio_element_keys[self.write_state - 2];
        let stream = self.file.stream();
        stream.write_fixed_kl(&key, 4, data.len() as u64)?;
        stream.write_all_bytes(data)?;

        self.write_state += 1; // next audio
        if self.write_state > self.num_audio_tracks + 1 {
            self.duration += 1; // content package is complete
            self.write_state = 0;
        }
        Ok(())
    }

    /// Write a whole content package.
    pub fn write_content_package(&mut self, cp: &crate::ArchiveContentPackage) -> Result<()> {
        assert!(!self.is_complete, "writer is complete");
        if cp.num_audio_tracks() < self.num_audio_tracks {
            return Err(Error::ContentPackageAudioTracks {
                have: cp.num_audio_tracks(),
                need: self.num_audio_tracks,
            });
        }
        self.write_timecode(cp.vitc(), cp.ltc())?;
        self.write_video_frame(cp.video())?;
        for i in 0..self.num_audio_tracks {
            self.write_audio_frame(cp.audio(i))?;
        }
        Ok(())
    }

    /// Finish the file: footer partition, RIP, duration patching, in-place
    /// header metadata and index rewrite, partition pack updates.
    pub fn complete(mut self) -> Result<S> {
        assert!(!self.is_complete, "writer is complete");
        assert_eq!(self.write_state, 0, "content package is incomplete");
        self.is_complete = true;

        let footer = self
            .file
            .create_partition(PartitionKind::Footer, PartitionStatus::ClosedComplete);
        self.file.write_partition(footer)?;

        self.file.write_rip()?;

        // stamp the durations in their native edit rates
        for update in &self.updates {
            match update {
                DurationUpdate::Component { id, edit_rate } => {
                    let duration = convert_position(self.duration, VIDEO_EDIT_RATE, *edit_rate);
                    self.metadata.set_mut(*id).set_int64_item(&items::DURATION, duration);
                }
                DurationUpdate::Descriptor(id) => {
                    let sample_rate = self.metadata.set(*id).rational_item(&items::SAMPLE_RATE)?;
                    let duration = convert_position(self.duration, VIDEO_EDIT_RATE, sample_rate);
                    self.metadata
                        .set_mut(*id)
                        .set_int64_item(&items::CONTAINER_DURATION, duration);
                }
            }
        }
        self.index.index_duration = self.duration;

        // re-write the header metadata and index in the reserved region
        self.file.stream().seek_to(self.header_metadata_start)?;
        self.file.write_header_metadata(&self.metadata, 0, None)?;
        self.file.write_index_segment(&self.index, 0, Some(FIXED_BODY_OFFSET))?;

        self.file.update_partitions()?;
        debug!(duration = self.duration, "completed archive file");
        Ok(self.file.into_inner())
    }
}

/// Average bytes per second of a wave descriptor.
fn avg_bps(sample_rate: Rational, channels: u32, quant_bits: u32) -> u32 {
    let bytes_per_sample = quant_bits.div_ceil(8);
    (sample_rate.num as u32 / sample_rate.den as u32) * channels * bytes_per_sample
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_bps_uses_rounded_up_bytes() {
        assert_eq!(avg_bps(RATE_48K, 1, 20), 144_000);
        assert_eq!(avg_bps(RATE_48K, 1, 16), 96_000);
        assert_eq!(avg_bps(RATE_48K, 2, 24), 288_000);
    }

    #[test]
    fn edit_unit_byte_count_matches_element_sizes() {
        let stream = std::io::Cursor::new(Vec::new());
        let writer = ArchiveWriter::new(stream, "test.mxf", 0, 0).unwrap();
        assert_eq!(
            writer.edit_unit_byte_count(),
            16 + 4 + 28 + 16 + 4 + VIDEO_FRAME_SIZE
        );
    }
}
