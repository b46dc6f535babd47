//! End-to-end clip writer tests; each produces real per-track files.

use std::fs::File;
use std::path::PathBuf;

use mxftool_avid::{AvidClipWriter, EssenceKind, EssenceParams, ProjectFormat};
use mxftool_core::{keys, IndexTableSegment, PartitionKind, PartitionStatus, Rational};
use mxftool_file::MxfFile;
use mxftool_labels::{avid, items, op, sets};
use mxftool_meta::{decode_indirect_string, register_avid_extensions, DataModel, HeaderMetadata};

fn avid_model() -> DataModel {
    let mut model = DataModel::baseline();
    register_avid_extensions(&mut model).unwrap();
    model.finalize().unwrap();
    model
}

/// Open a finished track file: partitions plus header metadata.
fn open_track(path: &PathBuf) -> (MxfFile<File>, HeaderMetadata) {
    let mut file = MxfFile::new(File::open(path).unwrap());
    file.read_header_partition().unwrap();
    let mut metadata = HeaderMetadata::new(avid_model()).unwrap();
    file.read_header_metadata(&mut metadata, 0).unwrap();
    file.read_partitions().unwrap();
    (file, metadata)
}

/// Read the index table segment in the footer partition.
fn read_footer_index(file: &mut MxfFile<File>) -> IndexTableSegment {
    let footer = file
        .partitions()
        .iter()
        .find(|p| p.kind == PartitionKind::Footer)
        .expect("footer partition")
        .clone();
    let runin = file.stream().runin();
    file.stream().seek_to(runin + footer.this_partition).unwrap();
    let (_, _, len) = file.stream().read_kl().unwrap();
    file.stream().skip(len).unwrap();
    let (key, _, len) = file.stream().read_next_nonfiller_kl().unwrap();
    assert!(keys::is_index_table_segment(&key));
    IndexTableSegment::read(file.stream(), len).unwrap()
}

#[test]
fn three_track_clip() {
    let dir = tempfile::tempdir().unwrap();
    let video_path = dir.path().join("clip_v1.mxf");
    let audio1_path = dir.path().join("clip_a1.mxf");
    let audio2_path = dir.path().join("clip_a2.mxf");

    let mut writer = AvidClipWriter::new(ProjectFormat::Pal25i, Rational::new(4, 3), false, true);
    writer.set_project_name("test project");
    writer.set_clip_name("test clip");
    writer.set_tape("test tape", 10 * 60 * 60 * 25);
    writer.add_user_comment("Descript", "a test project");

    writer
        .register_essence_element(1, 1, EssenceKind::Mjpeg201, EssenceParams::default(), &video_path)
        .unwrap();
    let pcm = EssenceParams {
        quantization_bits: 16,
    };
    writer
        .register_essence_element(2, 3, EssenceKind::Pcm, pcm, &audio1_path)
        .unwrap();
    writer
        .register_essence_element(3, 4, EssenceKind::Pcm, pcm, &audio2_path)
        .unwrap();

    writer.prepare_to_write().unwrap();

    let video_frame = vec![0u8; 288_000];
    let audio_frame = vec![0u8; 1920 * 2];
    for _ in 0..50 {
        writer.write_samples(1, 1, &video_frame).unwrap();
        writer.write_samples(2, 1920, &audio_frame).unwrap();
        writer.write_samples(3, 1920, &audio_frame).unwrap();
    }
    writer.complete_write().unwrap();

    // ---- video track file ----
    let (mut file, metadata) = open_track(&video_path);
    assert_eq!(file.partitions().len(), 3);
    assert!(op::is_op_atom(&file.partitions()[0].operational_pattern));
    assert_eq!(file.partitions()[0].status, PartitionStatus::ClosedComplete);
    assert_eq!(file.partitions()[1].kind, PartitionKind::Body);

    let cdci = metadata.find(&sets::CDCI_ESSENCE_DESCRIPTOR).expect("CDCI descriptor");
    assert_eq!(
        metadata.set(cdci).int64_item(&items::CONTAINER_DURATION).unwrap(),
        50
    );
    assert_eq!(
        metadata.set(cdci).int32_item(&avid::IMAGE_SIZE).unwrap(),
        50 * 288_000
    );

    // the "_PJ" project attribute hangs off the material package
    let material = metadata.find(&sets::MATERIAL_PACKAGE).unwrap();
    let attrs = metadata
        .set(material)
        .ref_vec_item(&avid::MOB_ATTRIBUTE_LIST)
        .unwrap()
        .to_vec();
    let tagged = metadata.resolve(&attrs[0]).unwrap();
    assert_eq!(tagged.string_item(&items::TAGGED_VALUE_NAME).unwrap(), "_PJ");
    assert_eq!(
        decode_indirect_string(tagged.raw_bytes_item(&items::TAGGED_VALUE_VALUE).unwrap()).unwrap(),
        "test project"
    );

    // the material package lists all three tracks
    assert_eq!(
        metadata.set(material).ref_vec_item(&items::TRACKS).unwrap().len(),
        3
    );

    // the essence element KL after the body partition carries the final
    // clip length
    let body = file.partitions()[1].clone();
    let runin = file.stream().runin();
    file.stream().seek_to(runin + body.this_partition).unwrap();
    let (_, _, pack_len) = file.stream().read_kl().unwrap();
    file.stream().skip(pack_len).unwrap();
    let (_, _, essence_len) = file.stream().read_kl().unwrap();
    assert_eq!(essence_len, 50 * 288_000);

    // VBR index in the footer: one delta entry and the Avid extra offset
    let index = read_footer_index(&mut file);
    assert_eq!(index.edit_unit_byte_count, 0);
    assert_eq!(index.delta_entries.len(), 1);
    assert_eq!(index.index_entries.len(), 51);
    assert_eq!(index.index_duration, 50);

    // ---- audio track files ----
    for path in [&audio1_path, &audio2_path] {
        let (mut file, metadata) = open_track(path);
        assert!(op::is_op_atom(&file.partitions()[0].operational_pattern));
        let wave = metadata.find(&sets::WAVE_AUDIO_DESCRIPTOR).expect("wave descriptor");
        assert_eq!(
            metadata.set(wave).int64_item(&items::CONTAINER_DURATION).unwrap(),
            50 * 1920
        );
        assert_eq!(metadata.set(wave).uint32_item(&items::AVG_BPS).unwrap(), 96_000);

        let index = read_footer_index(&mut file);
        assert_eq!(index.edit_unit_byte_count, 2);
        assert_eq!(index.index_duration, 50 * 1920);
        assert!(index.index_entries.is_empty());
    }
}

#[test]
fn vbr_index_entries_are_monotone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mjpeg_v1.mxf");

    let mut writer = AvidClipWriter::new(ProjectFormat::Pal25i, Rational::new(4, 3), false, true);
    writer
        .register_essence_element(1, 1, EssenceKind::Mjpeg201, EssenceParams::default(), &path)
        .unwrap();
    writer.prepare_to_write().unwrap();

    // variable frame sizes, every frame indexed
    for i in 0..1000u32 {
        let frame = vec![0u8; 100 + (i % 7) as usize];
        writer.write_samples(1, 1, &frame).unwrap();
    }
    writer.complete_write().unwrap();

    let (mut file, _) = open_track(&path);
    let index = read_footer_index(&mut file);
    assert_eq!(index.delta_entries.len(), 1);
    assert_eq!(index.index_entries.len(), 1001);
    assert!(index
        .index_entries
        .windows(2)
        .all(|w| w[0].stream_offset < w[1].stream_offset));
}

#[test]
fn abort_write_removes_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aborted_a1.mxf");

    let mut writer = AvidClipWriter::new(ProjectFormat::Pal25i, Rational::new(4, 3), false, false);
    writer
        .register_essence_element(
            1,
            1,
            EssenceKind::Pcm,
            EssenceParams {
                quantization_bits: 16,
            },
            &path,
        )
        .unwrap();
    writer.prepare_to_write().unwrap();
    writer.write_samples(1, 4, &[0u8; 8]).unwrap();
    assert!(path.exists());

    writer.abort_write(true).unwrap();
    assert!(!path.exists());
}

#[test]
fn sample_size_must_match_edit_units() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_a1.mxf");

    let mut writer = AvidClipWriter::new(ProjectFormat::Pal25i, Rational::new(4, 3), false, false);
    writer
        .register_essence_element(
            1,
            1,
            EssenceKind::Pcm,
            EssenceParams {
                quantization_bits: 16,
            },
            &path,
        )
        .unwrap();
    writer.prepare_to_write().unwrap();
    let err = writer.write_samples(1, 4, &[0u8; 7]).unwrap_err();
    assert!(matches!(err, mxftool_avid::Error::SampleSizeMismatch { .. }));
    writer.abort_write(true).unwrap();
}
