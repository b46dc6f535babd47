//! The clip writer: one OP-Atom MXF file per registered track.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use mxftool_core::{
    convert_position, DeltaEntry, IndexEntry, IndexTableSegment, PartitionKind, PartitionStatus,
    Rational, Timestamp, Umid,
};
use mxftool_file::MxfFile;
use mxftool_labels::{avid, datadef, essence, items, op, sets};
use mxftool_meta::{register_avid_extensions, AvidHeaderMetadata, DataModel, SetId};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::essence::{resolve, TrackConfig};
use crate::{Error, EssenceKind, EssenceParams, ProjectFormat, Result};

const BODY_SID: u32 = 1;
const INDEX_SID: u32 = 2;

/// Absolute offset of the body partition pack; the header metadata is
/// padded up to it so the completion rewrite cannot collide with essence.
const FIXED_BODY_OFFSET: u64 = 0x40020;

const IDENT_PRODUCT_UID: [u8; 16] = [
    0x57, 0x39, 0xb6, 0x2a, 0x1f, 0x0a, 0x4d, 0x6b, 0xa3, 0x6e, 0x10, 0xde, 0x4c, 0x77, 0x59, 0x2f,
];
const IDENT_COMPANY_NAME: &str = "mxftool";
const IDENT_PRODUCT_NAME: &str = "Avid MXF Writer";
const IDENT_VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

const FRAME_LAYOUT_SEPARATE_FIELDS: u8 = 1;
const FRAME_LAYOUT_SINGLE_FIELD: u8 = 2;
const FRAME_LAYOUT_MIXED_FIELDS: u8 = 3;
const COLOR_SITING_REC601: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Setup,
    Writing,
    Ended,
}

enum DurationUpdate {
    Component { id: SetId, edit_rate: Rational },
    Descriptor(SetId),
}

struct TrackData {
    kind: EssenceKind,
    params: EssenceParams,
    path: PathBuf,
    track_id: u32,
    track_number: u32,
    config: TrackConfig,
    file: Option<MxfFile<std::fs::File>>,
    metadata: Option<AvidHeaderMetadata>,
    index: IndexTableSegment,
    file_package_uid: Umid,
    updates: Vec<DurationUpdate>,
    header_metadata_start: u64,
    essence_start: u64,
    essence_len: u64,
    duration: i64,
    frame_offsets: Vec<u64>,
}

/// Snapshot of the registered tracks used while building each file's
/// material package.
struct TrackInfo {
    track_id: u32,
    track_number: u32,
    is_picture: bool,
    edit_rate: Rational,
    file_package_uid: Umid,
}

/// Writes a clip as per-track OP-Atom files with Avid-compatible
/// metadata.
///
/// Registration happens first, then [`AvidClipWriter::prepare_to_write`],
/// then samples, then [`AvidClipWriter::complete_write`] (or
/// [`AvidClipWriter::abort_write`]). Calls outside that order are
/// programming errors and panic.
#[must_use]
pub struct AvidClipWriter {
    format: ProjectFormat,
    project_edit_rate: Rational,
    aspect_ratio: Rational,
    drop_frame: bool,
    use_legacy: bool,
    project_name: Option<String>,
    clip_name: Option<String>,
    tape: Option<(String, i64)>,
    user_comments: BTreeMap<String, String>,
    tracks: BTreeMap<u32, TrackData>,
    state: WriterState,
}

impl AvidClipWriter {
    pub fn new(
        format: ProjectFormat,
        image_aspect_ratio: Rational,
        drop_frame: bool,
        use_legacy: bool,
    ) -> Self {
        AvidClipWriter {
            format,
            project_edit_rate: format.edit_rate(),
            aspect_ratio: image_aspect_ratio,
            drop_frame,
            use_legacy,
            project_name: None,
            clip_name: None,
            tape: None,
            user_comments: BTreeMap::new(),
            tracks: BTreeMap::new(),
            state: WriterState::Setup,
        }
    }

    pub fn set_project_name(&mut self, name: &str) {
        assert_eq!(self.state, WriterState::Setup, "writing has started");
        self.project_name = Some(name.to_owned());
    }

    pub fn set_clip_name(&mut self, name: &str) {
        assert_eq!(self.state, WriterState::Setup, "writing has started");
        self.clip_name = Some(name.to_owned());
    }

    pub fn set_tape(&mut self, name: &str, start_timecode: i64) {
        assert_eq!(self.state, WriterState::Setup, "writing has started");
        self.tape = Some((name.to_owned(), start_timecode));
    }

    /// Add or replace a user comment.
    pub fn add_user_comment(&mut self, name: &str, value: &str) {
        assert_eq!(self.state, WriterState::Setup, "writing has started");
        self.user_comments.insert(name.to_owned(), value.to_owned());
    }

    /// Register one essence track; its file is created at `path` by
    /// [`AvidClipWriter::prepare_to_write`].
    pub fn register_essence_element(
        &mut self,
        track_id: u32,
        track_number: u32,
        kind: EssenceKind,
        params: EssenceParams,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        assert_eq!(self.state, WriterState::Setup, "writing has started");
        if track_id < 1 {
            return Err(Error::InvalidTrackId);
        }
        if self.tracks.contains_key(&track_id) {
            return Err(Error::TrackAlreadyRegistered(track_id));
        }
        let config = resolve(kind, self.format, params)?;
        self.tracks.insert(
            track_id,
            TrackData {
                kind,
                params,
                path: path.as_ref().to_owned(),
                track_id,
                track_number,
                config,
                file: None,
                metadata: None,
                index: IndexTableSegment::new(),
                file_package_uid: Umid::null(),
                updates: Vec::new(),
                header_metadata_start: 0,
                essence_start: 0,
                essence_len: 0,
                duration: 0,
                frame_offsets: Vec::new(),
            },
        );
        Ok(())
    }

    /// Open every track file and write its header partition, header
    /// metadata and body partition.
    pub fn prepare_to_write(&mut self) -> Result<()> {
        assert_eq!(self.state, WriterState::Setup, "writing has started");

        let now = Timestamp::now();
        let material_package_uid = Umid::generate();
        let tape_package_uid = Umid::generate();
        for track in self.tracks.values_mut() {
            track.file_package_uid = Umid::generate();
        }
        let infos: Vec<TrackInfo> = self
            .tracks
            .values()
            .map(|track| TrackInfo {
                track_id: track.track_id,
                track_number: track.track_number,
                is_picture: track.kind.is_picture(),
                edit_rate: track.config.edit_rate,
                file_package_uid: track.file_package_uid,
            })
            .collect();

        let ctx = ClipContext {
            format: self.format,
            project_edit_rate: self.project_edit_rate,
            aspect_ratio: self.aspect_ratio,
            drop_frame: self.drop_frame,
            use_legacy: self.use_legacy,
            project_name: &self.project_name,
            clip_name: &self.clip_name,
            tape: &self.tape,
            user_comments: &self.user_comments,
            single_track: self.tracks.len() <= 1,
            now,
            material_package_uid,
            tape_package_uid,
        };
        for (tape_track_index, track) in self.tracks.values_mut().enumerate() {
            prepare_track(track, tape_track_index as u32 + 1, &infos, &ctx)?;
        }

        self.state = WriterState::Writing;
        Ok(())
    }

    /// Write `num_samples` samples to a track. The first write of a track
    /// emits the essence element KL with a zero length, patched on
    /// completion.
    pub fn write_samples(&mut self, track_id: u32, num_samples: u32, data: &[u8]) -> Result<()> {
        assert_eq!(self.state, WriterState::Writing, "writer is not writing");
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(Error::UnknownTrack(track_id))?;
        let file = track.file.as_mut().expect("track was prepared");

        if track.duration == 0 {
            // record the KL position so the length can be patched later
            track.essence_start = file.stream().position()?;
            file.stream()
                .write_fixed_kl(&track.config.element_key, track.config.element_llen, 0)?;
        }

        if track.kind.is_mjpeg() {
            // only single samples are supported, each frame is indexed
            if num_samples != 1 {
                return Err(Error::SingleSampleOnly);
            }
            track.frame_offsets.push(track.essence_len);
            file.stream().write_all_bytes(data)?;
            track.essence_len += data.len() as u64;
        } else {
            let expected =
                u64::from(track.config.edit_unit_byte_count) * u64::from(num_samples);
            if expected != data.len() as u64 {
                return Err(Error::SampleSizeMismatch {
                    expected,
                    actual: data.len(),
                });
            }
            file.stream().write_all_bytes(data)?;
            track.essence_len += data.len() as u64;
        }

        track.duration += i64::from(num_samples);
        Ok(())
    }

    /// Finish every track file: footer partition with index table, RIP,
    /// duration patching, in-place header metadata rewrite, essence length
    /// patch and partition pack updates.
    pub fn complete_write(&mut self) -> Result<()> {
        assert_eq!(self.state, WriterState::Writing, "writer is not writing");
        self.state = WriterState::Ended;

        // the clip duration is the minimum track duration, normalized to
        // the project edit rate
        let project_rate = self.project_edit_rate;
        let mut duration = -1i64;
        for track in self.tracks.values() {
            let normalized = convert_position(track.duration, track.config.edit_rate, project_rate);
            if duration == -1 || normalized < duration {
                duration = normalized;
            }
        }
        if duration < 0 {
            duration = 0;
        }

        for track in self.tracks.values_mut() {
            let file = track.file.as_mut().expect("track was prepared");

            // fill to the body partition KAG boundary
            file.fill_to_kag(1)?;

            let footer = file.create_partition(PartitionKind::Footer, PartitionStatus::ClosedComplete);
            file.partition_mut(footer).body_sid = 0;
            file.partition_mut(footer).index_sid = INDEX_SID;
            file.write_partition(footer)?;

            track.index.index_duration = track.duration;
            if track.kind.is_mjpeg() {
                // Avid expects an extra entry holding the total length
                track.frame_offsets.push(track.essence_len);
                let count = track.frame_offsets.len() as u32;

                file.mark_index_start(footer)?;
                let stream = file.stream();
                track.index.write_header(stream, 1, count)?;
                track.index.write_delta_entry_array_header(stream, 1)?;
                track.index.write_delta_entry(
                    stream,
                    DeltaEntry {
                        pos_table_index: 0,
                        slice: 0,
                        element_data: 0,
                    },
                )?;
                // the array header carries the true entry count, escaping
                // the 16-bit local set length limit
                track.index.write_avid_index_entry_array_header(stream, count)?;
                for offset in &track.frame_offsets {
                    track
                        .index
                        .write_index_entry(stream, &IndexEntry::at_offset(*offset, 0x80))?;
                }
                file.fill_to_kag(footer)?;
                file.mark_index_end(footer)?;
            } else {
                file.write_index_segment(&track.index, footer, None)?;
            }

            file.write_rip()?;

            // stamp the durations in each entity's native rate
            let metadata = track.metadata.as_mut().expect("track was prepared");
            for update in &track.updates {
                match update {
                    DurationUpdate::Component { id, edit_rate } => {
                        let value = convert_position(duration, project_rate, *edit_rate);
                        metadata.set_mut(*id).set_int64_item(&items::DURATION, value);
                    }
                    DurationUpdate::Descriptor(id) => {
                        let sample_rate = metadata.set(*id).rational_item(&items::SAMPLE_RATE)?;
                        let value = convert_position(duration, project_rate, sample_rate);
                        metadata
                            .set_mut(*id)
                            .set_int64_item(&items::CONTAINER_DURATION, value);
                        if metadata.set(*id).have_item(&avid::IMAGE_SIZE) {
                            metadata
                                .set_mut(*id)
                                .set_int32_item(&avid::IMAGE_SIZE, track.essence_len as i32);
                        }
                    }
                }
            }

            // the header partition is closed and complete now
            file.partition_mut(0).status = PartitionStatus::ClosedComplete;
            file.stream().seek_to(track.header_metadata_start)?;
            file.write_header_metadata(metadata, 0, Some(FIXED_BODY_OFFSET))?;

            // patch the essence element length
            file.stream().seek_to(track.essence_start)?;
            file.stream().write_fixed_kl(
                &track.config.element_key,
                track.config.element_llen,
                track.essence_len,
            )?;

            file.update_partitions()?;
            debug!(
                track_id = track.track_id,
                duration = track.duration,
                essence_len = track.essence_len,
                "completed clip track"
            );
        }

        self.tracks.clear();
        Ok(())
    }

    /// Stop writing, release the file handles and optionally unlink the
    /// files written so far.
    pub fn abort_write(&mut self, delete_files: bool) -> Result<()> {
        assert_ne!(self.state, WriterState::Ended, "writing has ended");
        self.state = WriterState::Ended;

        for track in self.tracks.values_mut() {
            track.file = None; // closes the handle
            if delete_files {
                if let Err(err) = std::fs::remove_file(&track.path) {
                    warn!(path = %track.path.display(), %err, "failed to remove aborted file");
                }
            }
        }
        self.tracks.clear();
        Ok(())
    }
}

struct ClipContext<'a> {
    format: ProjectFormat,
    project_edit_rate: Rational,
    aspect_ratio: Rational,
    drop_frame: bool,
    use_legacy: bool,
    project_name: &'a Option<String>,
    clip_name: &'a Option<String>,
    tape: &'a Option<(String, i64)>,
    user_comments: &'a BTreeMap<String, String>,
    single_track: bool,
    now: Timestamp,
    material_package_uid: Umid,
    tape_package_uid: Umid,
}

fn track_name(is_picture: bool, number: u32) -> String {
    format!("{}{}", if is_picture { "V" } else { "A" }, number)
}

fn data_definition(is_picture: bool, use_legacy: bool) -> mxftool_core::Ul {
    match (is_picture, use_legacy) {
        (true, true) => datadef::LEGACY_PICTURE,
        (true, false) => datadef::PICTURE,
        (false, true) => datadef::LEGACY_SOUND,
        (false, false) => datadef::SOUND,
    }
}

fn prepare_track(
    track: &mut TrackData,
    tape_track_id: u32,
    infos: &[TrackInfo],
    ctx: &ClipContext<'_>,
) -> Result<()> {
    let handle = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&track.path)?;
    let mut file = MxfFile::new(handle);
    file.stream().set_min_llen(track.config.min_llen)?;

    let pattern = if ctx.single_track {
        op::OP_ATOM_1_TRACK_1_SOURCE_CLIP
    } else {
        op::OP_ATOM_N_TRACKS_1_SOURCE_CLIP
    };

    // header partition pack; closed and complete once writing finishes
    let header = file.create_partition(PartitionKind::Header, PartitionStatus::ClosedIncomplete);
    {
        let partition = file.partition_mut(header);
        partition.operational_pattern = pattern;
        partition.add_essence_container(track.config.container_label);
    }
    file.write_partition(header)?;

    // header metadata with the Avid additions
    let mut model = DataModel::baseline();
    register_avid_extensions(&mut model)?;
    model.finalize()?;
    let mut md = AvidHeaderMetadata::new(model)?;

    md.create_default_meta_dictionary()?;

    // Preface
    let preface = md.create(&sets::PREFACE)?;
    {
        let set = md.set_mut(preface);
        set.set_int16_item(&items::BYTE_ORDER, 0x4949); // little-endian
        set.set_uint32_item(&items::OBJECT_MODEL_VERSION, 0x0000_0001);
        set.set_version_item(&items::VERSION, 0x0101); // AAF SDK version
        set.set_timestamp_item(&items::LAST_MODIFIED_DATE, ctx.now);
        set.set_ul_item(&items::OPERATIONAL_PATTERN, pattern);
        set.append_ul_item(&items::ESSENCE_CONTAINERS, track.config.container_label);
        if let Some(project_name) = ctx.project_name {
            set.set_string_item(&avid::PROJECT_NAME, project_name);
        }
        set.set_rational_item(&avid::PROJECT_EDIT_RATE, ctx.project_edit_rate);
        set.set_umid_item(&avid::MASTER_MOB_ID, ctx.material_package_uid);
        set.set_umid_item(&avid::ESSENCE_FILE_MOB_ID, track.file_package_uid);
        set.append_ul_item(&items::DM_SCHEMES, datadef::LEGACY_DMS1);
    }

    // Preface - Dictionary
    md.create_default_dictionary(preface)?;

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
        set.set_timestamp_item(&items::MODIFICATION_DATE, ctx.now);
    }

    // Preface - ContentStorage
    let content = md.create(&sets::CONTENT_STORAGE)?;
    md.set_mut(preface).set_ref_item(&items::CONTENT_STORAGE, content.0);

    // Preface - ContentStorage - MaterialPackage, listing every track of
    // the clip
    let material = md.create(&sets::MATERIAL_PACKAGE)?;
    md.set_mut(content).append_ref_item(&items::PACKAGES, material.0);
    {
        let set = md.set_mut(material);
        set.set_umid_item(&items::PACKAGE_UID, ctx.material_package_uid);
        set.set_timestamp_item(&items::PACKAGE_CREATION_DATE, ctx.now);
        set.set_timestamp_item(&items::PACKAGE_MODIFIED_DATE, ctx.now);
        if let Some(clip_name) = ctx.clip_name {
            set.set_string_item(&items::PACKAGE_NAME, clip_name);
        }
        set.set_boolean_item(&avid::CONVERT_FRAME_RATE, false);
        set.set_int32_item(&avid::APP_CODE, 0x07);
    }
    if let Some(project_name) = ctx.project_name.clone() {
        md.attach_attribute(material, "_PJ", &project_name)?;
    }
    for (name, value) in ctx.user_comments {
        md.attach_user_comment(material, name, value)?;
    }

    for info in infos {
        let mp_track = md.create(&sets::TRACK)?;
        md.set_mut(material).append_ref_item(&items::TRACKS, mp_track.0);
        {
            let set = md.set_mut(mp_track);
            set.set_string_item(&items::TRACK_NAME, &track_name(info.is_picture, info.track_number));
            set.set_uint32_item(&items::TRACK_ID, info.track_id);
            set.set_uint32_item(&items::TRACK_NUMBER, info.track_number);
            set.set_rational_item(&items::EDIT_RATE, info.edit_rate);
            set.set_int64_item(&items::ORIGIN, 0);
        }

        let sequence = md.create(&sets::SEQUENCE)?;
        md.set_mut(mp_track).set_ref_item(&items::SEQUENCE, sequence.0);
        {
            let set = md.set_mut(sequence);
            set.set_ul_item(&items::DATA_DEFINITION, data_definition(info.is_picture, ctx.use_legacy));
            set.set_int64_item(&items::DURATION, -1);
        }
        track.updates.push(DurationUpdate::Component {
            id: sequence,
            edit_rate: info.edit_rate,
        });

        let clip = md.create(&sets::SOURCE_CLIP)?;
        md.set_mut(sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, clip.0);
        {
            let set = md.set_mut(clip);
            set.set_ul_item(&items::DATA_DEFINITION, data_definition(info.is_picture, ctx.use_legacy));
            set.set_int64_item(&items::DURATION, -1);
            set.set_int64_item(&items::START_POSITION, 0);
            set.set_uint32_item(&items::SOURCE_TRACK_ID, 1);
            set.set_umid_item(&items::SOURCE_PACKAGE_ID, info.file_package_uid);
        }
        track.updates.push(DurationUpdate::Component {
            id: clip,
            edit_rate: info.edit_rate,
        });
    }

    // Preface - ContentStorage - file SourcePackage, this track only
    let is_picture = track.kind.is_picture();
    let file_package = md.create(&sets::SOURCE_PACKAGE)?;
    md.set_mut(content).append_ref_item(&items::PACKAGES, file_package.0);
    {
        let set = md.set_mut(file_package);
        set.set_umid_item(&items::PACKAGE_UID, track.file_package_uid);
        set.set_timestamp_item(&items::PACKAGE_CREATION_DATE, ctx.now);
        set.set_timestamp_item(&items::PACKAGE_MODIFIED_DATE, ctx.now);
    }
    if let Some(project_name) = ctx.project_name.clone() {
        md.attach_attribute(file_package, "_PJ", &project_name)?;
    }

    let fp_track = md.create(&sets::TRACK)?;
    md.set_mut(file_package).append_ref_item(&items::TRACKS, fp_track.0);
    {
        let set = md.set_mut(fp_track);
        set.set_string_item(&items::TRACK_NAME, &track_name(is_picture, 1));
        set.set_uint32_item(&items::TRACK_ID, 1);
        set.set_uint32_item(&items::TRACK_NUMBER, track.config.essence_track_number);
        set.set_rational_item(&items::EDIT_RATE, track.config.edit_rate);
        set.set_int64_item(&items::ORIGIN, 0);
    }

    let fp_sequence = md.create(&sets::SEQUENCE)?;
    md.set_mut(fp_track).set_ref_item(&items::SEQUENCE, fp_sequence.0);
    {
        let set = md.set_mut(fp_sequence);
        set.set_ul_item(&items::DATA_DEFINITION, data_definition(is_picture, ctx.use_legacy));
        set.set_int64_item(&items::DURATION, -1);
    }
    track.updates.push(DurationUpdate::Component {
        id: fp_sequence,
        edit_rate: track.config.edit_rate,
    });

    let fp_clip = md.create(&sets::SOURCE_CLIP)?;
    md.set_mut(fp_sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, fp_clip.0);
    {
        let set = md.set_mut(fp_clip);
        set.set_ul_item(&items::DATA_DEFINITION, data_definition(is_picture, ctx.use_legacy));
        set.set_int64_item(&items::DURATION, -1);
        match ctx.tape {
            Some((_, start_timecode)) => {
                set.set_int64_item(
                    &items::START_POSITION,
                    convert_position(*start_timecode, ctx.project_edit_rate, track.config.edit_rate),
                );
                set.set_uint32_item(&items::SOURCE_TRACK_ID, tape_track_id);
                set.set_umid_item(&items::SOURCE_PACKAGE_ID, ctx.tape_package_uid);
            }
            None => {
                set.set_int64_item(&items::START_POSITION, 0);
                set.set_uint32_item(&items::SOURCE_TRACK_ID, 0);
                set.set_umid_item(&items::SOURCE_PACKAGE_ID, Umid::null());
            }
        }
    }
    track.updates.push(DurationUpdate::Component {
        id: fp_clip,
        edit_rate: track.config.edit_rate,
    });

    // Preface - ContentStorage - file SourcePackage - Descriptor
    let descriptor = build_descriptor(&mut md, track, ctx)?;
    md.set_mut(file_package).set_ref_item(&items::DESCRIPTOR, descriptor.0);
    track.updates.push(DurationUpdate::Descriptor(descriptor));

    // Preface - ContentStorage - EssenceContainerData
    let ess_data = md.create(&sets::ESSENCE_CONTAINER_DATA)?;
    md.set_mut(content).append_ref_item(&items::ESSENCE_CONTAINER_DATA, ess_data.0);
    {
        let set = md.set_mut(ess_data);
        set.set_umid_item(&items::LINKED_PACKAGE_UID, track.file_package_uid);
        set.set_uint32_item(&items::INDEX_SID, INDEX_SID);
        set.set_uint32_item(&items::BODY_SID, BODY_SID);
    }

    // Preface - ContentStorage - tape SourcePackage
    if let Some((tape_name, _)) = ctx.tape {
        let rounded_timecode_base: u16 = match ctx.format {
            ProjectFormat::Pal25i => 25,
            ProjectFormat::Ntsc30i => 30,
        };
        let tape_len = 120 * 60 * 60 * i64::from(rounded_timecode_base);

        let tape_package = md.create(&sets::SOURCE_PACKAGE)?;
        md.set_mut(content).append_ref_item(&items::PACKAGES, tape_package.0);
        {
            let set = md.set_mut(tape_package);
            set.set_umid_item(&items::PACKAGE_UID, ctx.tape_package_uid);
            set.set_timestamp_item(&items::PACKAGE_CREATION_DATE, ctx.now);
            set.set_timestamp_item(&items::PACKAGE_MODIFIED_DATE, ctx.now);
            set.set_string_item(&items::PACKAGE_NAME, tape_name);
        }
        if let Some(project_name) = ctx.project_name.clone() {
            md.attach_attribute(tape_package, "_PJ", &project_name)?;
        }

        let mut tape_track_id = 1u32;
        for info in infos {
            let tp_track = md.create(&sets::TRACK)?;
            md.set_mut(tape_package).append_ref_item(&items::TRACKS, tp_track.0);
            {
                let set = md.set_mut(tp_track);
                set.set_string_item(&items::TRACK_NAME, &track_name(info.is_picture, info.track_number));
                set.set_uint32_item(&items::TRACK_ID, tape_track_id);
                set.set_uint32_item(&items::TRACK_NUMBER, info.track_number);
                set.set_rational_item(&items::EDIT_RATE, ctx.project_edit_rate);
                set.set_int64_item(&items::ORIGIN, 0);
            }

            let sequence = md.create(&sets::SEQUENCE)?;
            md.set_mut(tp_track).set_ref_item(&items::SEQUENCE, sequence.0);
            {
                let set = md.set_mut(sequence);
                set.set_ul_item(&items::DATA_DEFINITION, data_definition(info.is_picture, ctx.use_legacy));
                set.set_int64_item(&items::DURATION, tape_len);
            }

            let clip = md.create(&sets::SOURCE_CLIP)?;
            md.set_mut(sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, clip.0);
            {
                let set = md.set_mut(clip);
                set.set_ul_item(&items::DATA_DEFINITION, data_definition(info.is_picture, ctx.use_legacy));
                set.set_int64_item(&items::DURATION, tape_len);
                set.set_int64_item(&items::START_POSITION, 0);
                set.set_uint32_item(&items::SOURCE_TRACK_ID, 0);
                set.set_umid_item(&items::SOURCE_PACKAGE_ID, Umid::null());
            }
            tape_track_id += 1;
        }

        // tape timecode track
        let tc_track = md.create(&sets::TRACK)?;
        md.set_mut(tape_package).append_ref_item(&items::TRACKS, tc_track.0);
        {
            let set = md.set_mut(tc_track);
            set.set_string_item(&items::TRACK_NAME, "TC1");
            set.set_uint32_item(&items::TRACK_ID, tape_track_id);
            set.set_uint32_item(&items::TRACK_NUMBER, 1);
            set.set_rational_item(&items::EDIT_RATE, ctx.project_edit_rate);
            set.set_int64_item(&items::ORIGIN, 0);
        }
        let tc_sequence = md.create(&sets::SEQUENCE)?;
        md.set_mut(tc_track).set_ref_item(&items::SEQUENCE, tc_sequence.0);
        {
            let set = md.set_mut(tc_sequence);
            set.set_ul_item(
                &items::DATA_DEFINITION,
                if ctx.use_legacy { datadef::LEGACY_TIMECODE } else { datadef::TIMECODE },
            );
            set.set_int64_item(&items::DURATION, tape_len);
        }
        let tc_component = md.create(&sets::TIMECODE_COMPONENT)?;
        md.set_mut(tc_sequence).append_ref_item(&items::STRUCTURAL_COMPONENTS, tc_component.0);
        {
            let set = md.set_mut(tc_component);
            set.set_ul_item(
                &items::DATA_DEFINITION,
                if ctx.use_legacy { datadef::LEGACY_TIMECODE } else { datadef::TIMECODE },
            );
            set.set_int64_item(&items::DURATION, tape_len);
            set.set_uint16_item(&items::ROUNDED_TIMECODE_BASE, rounded_timecode_base);
            set.set_boolean_item(&items::DROP_FRAME, ctx.drop_frame);
            set.set_int64_item(&items::START_TIMECODE, 0);
        }

        // tape SourcePackage - TapeDescriptor
        let tape_descriptor = md.create(&sets::TAPE_DESCRIPTOR)?;
        md.set_mut(tape_package).set_ref_item(&items::DESCRIPTOR, tape_descriptor.0);
    }

    // write the header metadata, padded to the fixed body partition
    // offset so the completion rewrite has room
    track.header_metadata_start = file.stream().position()?;
    file.write_header_metadata(&md, 0, Some(FIXED_BODY_OFFSET))?;

    // closed, complete body partition; the clip-wrapped essence element
    // follows it
    let body = file.create_partition(PartitionKind::Body, PartitionStatus::ClosedComplete);
    file.partition_mut(body).body_sid = BODY_SID;
    file.write_partition(body)?;
    file.update_partitions()?;

    // the index table segment is written into the footer on completion
    let mut index = IndexTableSegment::new();
    index.index_edit_rate = track.config.edit_rate;
    index.index_duration = 0;
    index.edit_unit_byte_count = track.config.edit_unit_byte_count;
    index.index_sid = INDEX_SID;
    index.body_sid = BODY_SID;

    track.index = index;
    track.file = Some(file);
    track.metadata = Some(md);
    debug!(track_id = track.track_id, path = %track.path.display(), "prepared clip track");
    Ok(())
}

/// Populate the CDCI or Wave descriptor for a track.
fn build_descriptor(
    md: &mut AvidHeaderMetadata,
    track: &TrackData,
    ctx: &ClipContext<'_>,
) -> Result<SetId> {
    if track.kind == EssenceKind::Pcm {
        let wave = md.create(&sets::WAVE_AUDIO_DESCRIPTOR)?;
        let quant_bits = track.params.quantization_bits;
        let block_align = quant_bits.div_ceil(8);
        let set = md.set_mut(wave);
        set.set_ul_item(&items::ESSENCE_CONTAINER, track.config.container_label);
        set.set_rational_item(&items::SAMPLE_RATE, track.config.edit_rate);
        set.set_rational_item(&items::AUDIO_SAMPLING_RATE, track.config.edit_rate);
        set.set_uint32_item(&items::CHANNEL_COUNT, 1);
        set.set_uint32_item(&items::QUANTIZATION_BITS, quant_bits);
        set.set_uint16_item(&items::BLOCK_ALIGN, block_align as u16);
        // sample rate x channels x bytes per sample
        let sample_rate = track.config.edit_rate.num as u32 / track.config.edit_rate.den as u32;
        set.set_uint32_item(&items::AVG_BPS, sample_rate * block_align);
        return Ok(wave);
    }

    let cdci = md.create(&sets::CDCI_ESSENCE_DESCRIPTOR)?;
    let pal = ctx.format == ProjectFormat::Pal25i;
    let set = md.set_mut(cdci);
    set.set_rational_item(&items::SAMPLE_RATE, track.config.edit_rate);
    set.set_rational_item(&items::ASPECT_RATIO, ctx.aspect_ratio);
    if let Some(coding) = track.kind.picture_coding() {
        set.set_ul_item(&items::PICTURE_ESSENCE_CODING, coding);
    }
    set.set_uint8_item(&items::COLOR_SITING, COLOR_SITING_REC601);
    set.set_uint32_item(&items::COMPONENT_DEPTH, 8);
    set.set_uint32_item(&items::BLACK_REF_LEVEL, 16);
    set.set_uint32_item(&items::WHITE_REF_LEVEL, 235);
    set.set_uint32_item(&items::COLOR_RANGE, 225);
    set.set_uint32_item(&items::IMAGE_ALIGNMENT_OFFSET, 1);
    if let Some(resolution_id) = track.kind.resolution_id() {
        set.set_int32_item(&avid::RESOLUTION_ID, resolution_id);
    }
    set.set_int32_item(&avid::IMAGE_SIZE, 0);

    if track.kind.is_mjpeg() {
        // Avid requires its own container label on MJPEG descriptors
        set.set_ul_item(&items::ESSENCE_CONTAINER, essence::AVID_AAF_KLV_ESSENCE_CONTAINER);
        set.set_int32_item(&avid::FRAME_SAMPLE_SIZE, 0);
        if track.kind == EssenceKind::Mjpeg151s {
            set.append_int32_item(&items::VIDEO_LINE_MAP, 15);
            set.set_uint32_item(&items::STORED_WIDTH, 352);
            set.set_uint32_item(&items::STORED_HEIGHT, 296);
            set.set_uint32_item(&items::DISPLAY_WIDTH, 352);
            set.set_uint32_item(&items::DISPLAY_HEIGHT, 288);
            set.set_uint8_item(&items::FRAME_LAYOUT, FRAME_LAYOUT_SINGLE_FIELD);
        } else {
            set.append_int32_item(&items::VIDEO_LINE_MAP, 15);
            set.append_int32_item(&items::VIDEO_LINE_MAP, 328);
            set.set_uint32_item(&items::STORED_WIDTH, 720);
            set.set_uint32_item(&items::STORED_HEIGHT, 296);
            set.set_uint32_item(&items::DISPLAY_WIDTH, 720);
            set.set_uint32_item(&items::DISPLAY_HEIGHT, 288);
            set.set_uint8_item(&items::FRAME_LAYOUT, FRAME_LAYOUT_SEPARATE_FIELDS);
        }
        set.set_int32_item(&items::DISPLAY_X_OFFSET, 0);
        set.set_int32_item(&items::DISPLAY_Y_OFFSET, 8);
        set.set_uint32_item(&items::HORIZONTAL_SUBSAMPLING, 2);
        set.set_uint32_item(&items::VERTICAL_SUBSAMPLING, 1);
    } else {
        // DV kinds
        set.set_ul_item(&items::ESSENCE_CONTAINER, track.config.container_label);
        set.set_int32_item(&avid::FRAME_SAMPLE_SIZE, track.config.edit_unit_byte_count as i32);
        if pal {
            set.append_int32_item(&items::VIDEO_LINE_MAP, 23);
            set.append_int32_item(&items::VIDEO_LINE_MAP, 335);
            set.set_uint32_item(&items::STORED_WIDTH, 720);
            set.set_uint32_item(&items::STORED_HEIGHT, 288);
            set.set_uint32_item(&items::DISPLAY_WIDTH, 720);
            set.set_uint32_item(&items::DISPLAY_HEIGHT, 288);
        } else {
            set.append_int32_item(&items::VIDEO_LINE_MAP, 23);
            set.append_int32_item(&items::VIDEO_LINE_MAP, 285);
            set.set_uint32_item(&items::STORED_WIDTH, 720);
            set.set_uint32_item(&items::STORED_HEIGHT, 240);
            set.set_uint32_item(&items::DISPLAY_WIDTH, 720);
            set.set_uint32_item(&items::DISPLAY_HEIGHT, 240);
        }
        set.set_int32_item(&items::DISPLAY_X_OFFSET, 0);
        set.set_int32_item(&items::DISPLAY_Y_OFFSET, 0);
        let (layout, hsub, vsub) = match (track.kind, ctx.use_legacy) {
            (EssenceKind::IecDv25, true) => (FRAME_LAYOUT_MIXED_FIELDS, 2, 2),
            (EssenceKind::IecDv25, false) => (FRAME_LAYOUT_SEPARATE_FIELDS, 2, 2),
            (EssenceKind::DvBased25, true) => (FRAME_LAYOUT_MIXED_FIELDS, 2, 2),
            (EssenceKind::DvBased25, false) => (FRAME_LAYOUT_SEPARATE_FIELDS, 4, 1),
            (_, true) => (FRAME_LAYOUT_MIXED_FIELDS, 2, 1),
            (_, false) => (FRAME_LAYOUT_SEPARATE_FIELDS, 2, 1),
        };
        set.set_uint8_item(&items::FRAME_LAYOUT, layout);
        set.set_uint32_item(&items::HORIZONTAL_SUBSAMPLING, hsub);
        set.set_uint32_item(&items::VERTICAL_SUBSAMPLING, vsub);
    }
    Ok(cdci)
}
