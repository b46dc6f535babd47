//! End-to-end archive writer/reader tests.

use std::io::Cursor;

use mxftool_archive::{ArchiveReader, ArchiveWriter, Timecode};
use mxftool_core::{keys, IndexTableSegment, PartitionKind, RandomIndexPack};
use mxftool_file::MxfFile;
use mxftool_labels::op;
use proptest::prelude::*;

const VIDEO_FRAME_SIZE: u32 = 720 * 576 * 2;

/// Timecode `start` advanced by `frames` at 25 fps.
fn tc_plus(start: Timecode, frames: i64) -> Timecode {
    let total = i64::from(start.hour) * 90000
        + i64::from(start.min) * 1500
        + i64::from(start.sec) * 25
        + i64::from(start.frame)
        + frames;
    Timecode::new(
        (total / 90000 % 24) as u8,
        (total / 1500 % 60) as u8,
        (total / 25 % 60) as u8,
        (total % 25) as u8,
    )
}

/// Write `frames` content packages with small, consistently sized
/// elements; the reader derives the package size from the first one.
fn write_archive(
    num_audio: usize,
    frames: i64,
    vitc_start: Timecode,
    ltc_start: Timecode,
) -> Vec<u8> {
    let mut writer =
        ArchiveWriter::new(Cursor::new(Vec::new()), "test.mxf", num_audio, 0).unwrap();
    let video = vec![0u8; 64];
    let audio = vec![0u8; 48];
    for i in 0..frames {
        writer
            .write_timecode(tc_plus(vitc_start, i), tc_plus(ltc_start, i))
            .unwrap();
        writer.write_video_frame(&video).unwrap();
        for _ in 0..num_audio {
            writer.write_audio_frame(&audio).unwrap();
        }
    }
    writer.complete().unwrap().into_inner()
}

#[test]
fn minimal_file_layout() {
    // zero audio tracks, zero duration
    let writer = ArchiveWriter::new(Cursor::new(Vec::new()), "minimal.mxf", 0, 0).unwrap();
    assert_eq!(writer.edit_unit_byte_count(), 16 + 4 + 28 + 16 + 4 + VIDEO_FRAME_SIZE);
    let bytes = writer.complete().unwrap().into_inner();

    let mut file = MxfFile::new(Cursor::new(bytes.clone()));
    file.read_partitions().unwrap();
    assert_eq!(file.partitions().len(), 2);
    assert_eq!(file.partitions()[0].kind, PartitionKind::Header);
    assert_eq!(file.partitions()[1].kind, PartitionKind::Footer);
    assert!(op::is_op_1a(&file.partitions()[0].operational_pattern));
    assert_eq!(file.partitions()[0].essence_containers.len(), 3);

    // the RIP lists both partitions with increasing offsets
    let rip = RandomIndexPack::read(file.stream()).unwrap();
    assert_eq!(rip.entries.len(), 2);
    assert!(rip.entries[0].this_partition < rip.entries[1].this_partition);

    // back-references
    let footer_offset = file.partitions()[1].this_partition;
    assert_eq!(file.partitions()[0].footer_partition, footer_offset);
    assert_eq!(
        file.partitions()[1].previous_partition,
        file.partitions()[0].this_partition
    );

    // the index table segment sits after the header metadata and carries
    // the fixed edit unit byte count
    let header = file.partitions()[0].clone();
    file.stream()
        .seek_to(header.this_partition + header.header_byte_count + header_pack_size(&bytes))
        .unwrap();
    let (key, _, len) = file.stream().read_next_nonfiller_kl().unwrap();
    assert!(keys::is_index_table_segment(&key));
    let segment = IndexTableSegment::read(file.stream(), len).unwrap();
    assert_eq!(segment.edit_unit_byte_count, 16 + 4 + 28 + 16 + 4 + VIDEO_FRAME_SIZE);
    assert_eq!(segment.index_duration, 0);
    assert_eq!(segment.delta_entries.len(), 2);
}

/// Size of the header partition pack KLV at the start of `bytes`.
fn header_pack_size(bytes: &[u8]) -> u64 {
    let mut stream = mxftool_core::MxfStream::new(Cursor::new(bytes.to_vec()));
    let (_, llen, len) = stream.read_kl().unwrap();
    16 + u64::from(llen) + len
}

#[test]
fn write_read_round_trip() {
    let start = Timecode::new(10, 0, 0, 0);
    let bytes = write_archive(4, 25, start, start);

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.duration(), 25);
    assert_eq!(reader.num_audio_tracks(), 4);

    for i in 0..25 {
        let cp = reader.read().unwrap().expect("package within duration");
        assert_eq!(cp.position(), i);
        assert_eq!(cp.vitc(), tc_plus(start, i));
        assert_eq!(cp.ltc(), tc_plus(start, i));
        assert_eq!(cp.num_audio_tracks(), 4);
        assert_eq!(cp.video().len(), 64);
        assert_eq!(cp.audio(3).len(), 48);
    }
    assert!(reader.is_eof());
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn duration_is_stamped_in_native_edit_rates() {
    let start = Timecode::new(10, 0, 0, 0);
    let bytes = write_archive(2, 25, start, start);

    let reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let md = reader.metadata();
    use mxftool_labels::{items, sets};

    // sequences carry 25 edit units at 25/1 and the wave descriptors
    // carry the video duration converted to their sample rate
    let material = md.find(&sets::MATERIAL_PACKAGE).unwrap();
    let tracks = md.set(material).ref_vec_item(&items::TRACKS).unwrap().to_vec();
    let timecode_sequence = md.resolve(&tracks[0]).unwrap().ref_item(&items::SEQUENCE).unwrap();
    assert_eq!(
        md.resolve(&timecode_sequence)
            .unwrap()
            .int64_item(&items::DURATION)
            .unwrap(),
        25
    );
    for wave in md.find_all(&sets::WAVE_AUDIO_DESCRIPTOR) {
        assert_eq!(
            md.set(wave).int64_item(&items::CONTAINER_DURATION).unwrap(),
            25
        );
        assert_eq!(md.set(wave).uint32_item(&items::AVG_BPS).unwrap(), 144_000);
    }
}

#[test]
fn seek_to_timecode_with_clean_timecodes() {
    let vitc_start = Timecode::new(10, 2, 5, 10);
    let bytes = write_archive(0, 100, vitc_start, vitc_start);

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let found = reader
        .seek_to_timecode(Some(Timecode::new(10, 2, 5, 20)), None)
        .unwrap();
    assert!(found);
    assert_eq!(reader.position(), 10);

    // the package at the found position carries the requested timecode
    let cp = reader.read().unwrap().unwrap();
    assert_eq!(cp.vitc(), Timecode::new(10, 2, 5, 20));
}

#[test]
fn seek_to_timecode_miss_restores_position() {
    let vitc_start = Timecode::new(10, 2, 5, 10);
    let bytes = write_archive(0, 100, vitc_start, vitc_start);

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    // consume a few packages so the original position is not zero
    for _ in 0..3 {
        reader.read().unwrap().unwrap();
    }
    let before = reader.position();
    let found = reader
        .seek_to_timecode(Some(Timecode::new(11, 0, 0, 0)), None)
        .unwrap();
    assert!(!found);
    assert_eq!(reader.position(), before);
}

#[test]
fn seek_to_timecode_matches_ltc_only() {
    let vitc_start = Timecode::new(10, 0, 0, 0);
    let ltc_start = Timecode::new(12, 30, 0, 0);
    let bytes = write_archive(1, 50, vitc_start, ltc_start);

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let found = reader
        .seek_to_timecode(None, Some(tc_plus(ltc_start, 30)))
        .unwrap();
    assert!(found);
    assert_eq!(reader.position(), 30);
}

proptest! {
    /// SMPTE-12M encoding round-trips over the full component ranges.
    #[test]
    fn timecode_12m_round_trip(
        hour in 0u8..24,
        min in 0u8..60,
        sec in 0u8..60,
        frame in 0u8..40,
        drop_frame in any::<bool>()
    ) {
        let timecode = Timecode { hour, min, sec, frame, drop_frame };
        prop_assert_eq!(Timecode::from_12m(&timecode.to_12m()), timecode);
    }
}
