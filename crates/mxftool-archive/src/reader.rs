//! Archive MXF reader with timecode search.

use std::io::{Read, Seek};

use mxftool_core::{Key, KEY_SIZE};
use mxftool_file::MxfFile;
use mxftool_labels::{datadef, essence, items, op, sets};
use mxftool_meta::{DataModel, HeaderMetadata};
use tracing::{debug, trace};

use crate::writer::register_archive_extensions;
use crate::{ArchiveContentPackage, Error, Result, Timecode, MAX_CP_AUDIO_TRACKS};

/// A timecode is clean once it has incremented one frame at a time for
/// this many consecutive frames; the search then extrapolates.
const CLEAN_TIMECODE_THRESHOLD: usize = 10;

/// Reader for frame-wrapped archive files.
#[must_use]
pub struct ArchiveReader<S> {
    file: MxfFile<S>,
    metadata: HeaderMetadata,
    num_audio_tracks: usize,
    audio_element_keys: Vec<Key>,
    position: i64,
    duration: i64,
    actual_position: i64,
    start_of_essence: u64,
    cp: ArchiveContentPackage,
}

impl<S: Read + Seek> ArchiveReader<S> {
    /// Open an archive file: validate the header partition, read the
    /// header metadata, position at the start of essence and pre-read the
    /// first content package.
    pub fn new(stream: S) -> Result<Self> {
        let mut file = MxfFile::new(stream);
        file.read_header_partition()?;
        let header = file.partition(0).clone();

        if !op::is_op_1a(&header.operational_pattern) {
            return Err(Error::NotOp1a(header.operational_pattern));
        }
        if header.essence_containers.len() != 3 {
            return Err(Error::WrongContainerCount(header.essence_containers.len()));
        }
        for label in &header.essence_containers {
            if !label.matches_ignoring_version(&essence::MULTIPLE_WRAPPINGS)
                && !label.matches_ignoring_version(&essence::SD_UNC_625_50I_422_135_FRAME_WRAPPED)
                && !label.matches_ignoring_version(&essence::BWF_FRAME_WRAPPED)
            {
                return Err(Error::UnknownEssenceContainer(*label));
            }
        }

        let mut model = DataModel::baseline();
        register_archive_extensions(&mut model)?;
        model.finalize()?;
        let mut metadata = HeaderMetadata::new(model)?;
        let header_start = file.read_header_metadata(&mut metadata, 0)?;

        // duration and audio track count come from the material package
        let mut duration = None;
        let mut num_audio_tracks = 0usize;
        if let Some(material) = metadata.find(&sets::MATERIAL_PACKAGE) {
            let track_uids = metadata.set(material).ref_vec_item(&items::TRACKS)?.to_vec();
            for track_uid in track_uids {
                let Some(track) = metadata.resolve(&track_uid) else {
                    continue;
                };
                if track.key != sets::TRACK {
                    continue;
                }
                let sequence_uid = track.ref_item(&items::SEQUENCE)?;
                let Some(sequence) = metadata.resolve(&sequence_uid) else {
                    continue;
                };
                if duration.is_none() {
                    if let Ok(value) = sequence.int64_item(&items::DURATION) {
                        duration = Some(value);
                    }
                }
                let data_def = sequence.ul_item(&items::DATA_DEFINITION)?;
                if datadef::is_sound(&data_def) {
                    num_audio_tracks += 1;
                }
            }
        }
        let duration = duration.ok_or(Error::NoDuration)?;
        if num_audio_tracks > MAX_CP_AUDIO_TRACKS {
            return Err(Error::TooManyAudioTracks {
                have: num_audio_tracks,
                max: MAX_CP_AUDIO_TRACKS,
            });
        }

        // the number of audio tracks in the material package is assumed to
        // equal the number of audio elements in the essence data
        let audio_element_keys: Vec<Key> = (0..num_audio_tracks)
            .map(|i| essence::archive_audio_element_key(num_audio_tracks as u8, i as u8))
            .collect();

        // position at the start of essence
        let start_of_essence =
            header_start + header.header_byte_count + header.index_byte_count;
        file.stream().seek_to(start_of_essence)?;
        debug!(duration, num_audio_tracks, start_of_essence, "opened archive file");

        let mut reader = ArchiveReader {
            file,
            metadata,
            num_audio_tracks,
            audio_element_keys,
            position: 0,
            duration,
            actual_position: 0,
            start_of_essence,
            cp: ArchiveContentPackage {
                position: -1,
                audio: vec![Vec::new(); num_audio_tracks],
                ..ArchiveContentPackage::default()
            },
        };

        // pre-read the first content package
        if reader.duration > 0 {
            reader.read_first_content_package()?;
        }
        Ok(reader)
    }

    fn read_first_content_package(&mut self) -> Result<()> {
        // skip initial filler by hand so its size is not counted into the
        // fixed content package size
        let key = loop {
            let key = self.file.stream().read_k()?;
            if !mxftool_core::keys::is_filler(&key) {
                break key;
            }
            let (_, len) = self.file.stream().read_l()?;
            self.file.stream().skip(len)?;
        };
        if key != essence::SYSTEM_ITEM_ELEMENT {
            return Err(Error::UnexpectedElement {
                expected: essence::SYSTEM_ITEM_ELEMENT,
                actual: key,
            });
        }
        let (llen, len) = self.file.stream().read_l()?;
        let (vitc, ltc) = self.read_timecodes(len)?;
        self.cp.vitc = vitc;
        self.cp.ltc = ltc;
        let mut size = KEY_SIZE as u32 + u32::from(llen) + len as u32;

        size += self.read_video_element()?;
        for i in 0..self.num_audio_tracks {
            size += self.read_audio_element(i)?;
        }

        self.cp.size = size;
        self.cp.position = self.position;
        self.actual_position += 1;
        Ok(())
    }

    fn read_timecodes(&mut self, len: u64) -> Result<(Timecode, Timecode)> {
        if len != 28 {
            return Err(Error::SystemItemSize(len));
        }
        let bytes = self.file.stream().read_vec(28)?;
        Ok((
            Timecode::from_12m(&bytes[12..20]),
            Timecode::from_12m(&bytes[20..28]),
        ))
    }

    /// Read one essence element, checking its key; returns the total
    /// encoded size.
    fn read_element(&mut self, expected: &Key) -> Result<(Vec<u8>, u32)> {
        let (key, llen, len) = self.file.stream().read_kl()?;
        if key != *expected {
            return Err(Error::UnexpectedElement {
                expected: *expected,
                actual: key,
            });
        }
        let bytes = self.file.stream().read_vec(len as usize)?;
        Ok((bytes, KEY_SIZE as u32 + u32::from(llen) + len as u32))
    }

    fn read_video_element(&mut self) -> Result<u32> {
        let (bytes, size) = self.read_element(&essence::archive_video_element_key())?;
        self.cp.video = bytes;
        Ok(size)
    }

    fn read_audio_element(&mut self, index: usize) -> Result<u32> {
        let key = self.audio_element_keys[index];
        let (bytes, size) = self.read_element(&key)?;
        self.cp.audio[index] = bytes;
        Ok(size)
    }

    /// Read the system item of the content package at the current file
    /// position without advancing the logical position.
    fn read_system_item(&mut self) -> Result<(Timecode, Timecode)> {
        let (key, _, len) = self.file.stream().read_kl()?;
        if key != essence::SYSTEM_ITEM_ELEMENT {
            return Err(Error::UnexpectedElement {
                expected: essence::SYSTEM_ITEM_ELEMENT,
                actual: key,
            });
        }
        self.read_timecodes(len)
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn num_audio_tracks(&self) -> usize {
        self.num_audio_tracks
    }

    pub fn metadata(&self) -> &HeaderMetadata {
        &self.metadata
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.duration
    }

    /// Seek to an edit-unit position using the fixed content package size.
    pub fn seek_to_position(&mut self, position: i64) -> Result<()> {
        if self.duration == 0 && position == 0 {
            return Ok(());
        }
        if self.duration == 0 {
            return Err(Error::SeekWithZeroDuration);
        }
        if position > self.duration {
            return Err(Error::SeekBeyondDuration {
                position,
                duration: self.duration,
            });
        }
        self.file
            .stream()
            .seek_to(self.start_of_essence + position as u64 * u64::from(self.cp.size))?;
        self.actual_position = position;
        self.position = position;
        Ok(())
    }

    /// Read the next content package; `None` at end of file.
    pub fn read(&mut self) -> Result<Option<&ArchiveContentPackage>> {
        if self.position >= self.duration {
            return Ok(None);
        }

        if self.cp.position == self.position {
            // content package was already read (pre-read or seek)
            self.position += 1;
            if self.actual_position != self.position {
                self.seek_to_position(self.position)?;
            }
            return Ok(Some(&self.cp));
        }

        self.cp.position = -1;
        let mut size = 0u32;

        let (key, llen, len) = self.file.stream().read_kl()?;
        if key != essence::SYSTEM_ITEM_ELEMENT {
            return Err(Error::UnexpectedElement {
                expected: essence::SYSTEM_ITEM_ELEMENT,
                actual: key,
            });
        }
        let (vitc, ltc) = self.read_timecodes(len)?;
        self.cp.vitc = vitc;
        self.cp.ltc = ltc;
        size += KEY_SIZE as u32 + u32::from(llen) + len as u32;
        size += self.read_video_element()?;
        for i in 0..self.num_audio_tracks {
            size += self.read_audio_element(i)?;
        }

        // the content package size is fixed for one file
        if size != self.cp.size {
            return Err(Error::ContentPackageSize {
                expected: self.cp.size,
                actual: size,
            });
        }

        self.cp.position = self.position;
        self.position += 1;
        self.actual_position += 1;
        Ok(Some(&self.cp))
    }

    /// Search forward for a content package matching the requested
    /// timecodes; `None` target components match anything.
    ///
    /// The scan is linear until the embedded timecodes have been
    /// incrementing by exactly one frame for more than the clean
    /// threshold; then a single extrapolated jump is tried. A miss or any
    /// failure on the jump path falls back to the linear scan for the
    /// rest of the file. Returns `false` and restores the original
    /// position when the timecode is not found; errors also restore the
    /// original position.
    pub fn seek_to_timecode(
        &mut self,
        vitc: Option<Timecode>,
        ltc: Option<Timecode>,
    ) -> Result<bool> {
        if self.duration == 0 {
            return Ok(false);
        }
        let original = self.position;
        match self.seek_to_timecode_inner(vitc, ltc) {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.seek_to_position(original)?;
                Ok(false)
            }
            Err(err) => {
                // restore the position before surfacing the error
                let _ = self.seek_to_position(original);
                Err(err)
            }
        }
    }

    fn seek_to_timecode_inner(
        &mut self,
        vitc: Option<Timecode>,
        ltc: Option<Timecode>,
    ) -> Result<bool> {
        let target_vitc_count = vitc.map(|t| t.frame_count()).unwrap_or(0);
        let target_ltc_count = ltc.map(|t| t.frame_count()).unwrap_or(0);
        let mut try_extrapolate = true;
        let mut clean_count = 0usize;
        let mut prev_vitc_count = 0i64;
        let mut prev_ltc_count = 0i64;

        let matches = |current: Timecode, target: Option<Timecode>| match target {
            Some(t) => current == t,
            None => true,
        };

        while self.position < self.duration {
            let (current_vitc, current_ltc) = self.read_system_item()?;

            if matches(current_vitc, vitc) && matches(current_ltc, ltc) {
                self.seek_to_position(self.position)?;
                return Ok(true);
            }

            let next_position = self.position + 1;

            if try_extrapolate {
                let current_vitc_count = current_vitc.frame_count();
                let current_ltc_count = current_ltc.frame_count();

                // a component is clean while it increments one frame at a
                // time and has not passed the target
                let vitc_is_clean = match vitc {
                    Some(_) => {
                        let clean = current_vitc_count <= target_vitc_count
                            && prev_vitc_count + 1 == current_vitc_count;
                        prev_vitc_count = current_vitc_count;
                        clean
                    }
                    None => true,
                };
                let ltc_is_clean = match ltc {
                    Some(_) => {
                        let clean = current_ltc_count <= target_ltc_count
                            && prev_ltc_count + 1 == current_ltc_count;
                        prev_ltc_count = current_ltc_count;
                        clean
                    }
                    None => true,
                };

                if vitc_is_clean && ltc_is_clean {
                    clean_count += 1;
                } else {
                    clean_count = 0;
                }

                if clean_count > CLEAN_TIMECODE_THRESHOLD {
                    let diff = if vitc.is_some() {
                        target_vitc_count - current_vitc_count
                    } else {
                        target_ltc_count - current_ltc_count
                    };
                    trace!(diff, position = self.position, "extrapolating timecode seek");

                    let jumped = self.try_extrapolated_jump(diff, vitc, ltc);
                    match jumped {
                        Ok(true) => return Ok(true),
                        // a miss or failure disables further extrapolation
                        Ok(false) | Err(_) => try_extrapolate = false,
                    }
                }
            }

            self.seek_to_position(next_position)?;
        }

        Ok(false)
    }

    fn try_extrapolated_jump(
        &mut self,
        diff: i64,
        vitc: Option<Timecode>,
        ltc: Option<Timecode>,
    ) -> Result<bool> {
        self.seek_to_position(self.position + diff)?;
        let (current_vitc, current_ltc) = self.read_system_item()?;
        let vitc_matches = vitc.map(|t| current_vitc == t).unwrap_or(true);
        let ltc_matches = ltc.map(|t| current_ltc == t).unwrap_or(true);
        if vitc_matches && ltc_matches {
            self.seek_to_position(self.position)?;
            return Ok(true);
        }
        Ok(false)
    }
}
