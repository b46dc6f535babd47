//! Index table segments.
//!
//! An index table segment is a single KLV whose value is a local set
//! describing edit-unit positions for one essence container body. Two
//! layouts are written:
//!
//! 1. Monolithic: the whole set is built in memory; every item length must
//!    fit the 16-bit local-set length field.
//! 2. Streamed: the set header is written first, then delta and index
//!    entries one at a time. The array headers carry the true entry count,
//!    which is how very large VBR tables escape the 16-bit item limit
//!    (Avid convention: readers trust the array header, not the item
//!    length).
//!
//! Reads accept both layouts by always sizing the entry arrays from their
//! array headers.

use std::io::{Cursor, Read, Seek, Write};

use byteorder::{BigEndian, ReadBytesExt};
use uuid::Uuid;

use crate::{keys, Error, MxfStream, Partition, Rational, Result};

const TAG_INSTANCE_UID: u16 = 0x3C0A;
const TAG_INDEX_EDIT_RATE: u16 = 0x3F0B;
const TAG_INDEX_START_POSITION: u16 = 0x3F0C;
const TAG_INDEX_DURATION: u16 = 0x3F0D;
const TAG_EDIT_UNIT_BYTE_COUNT: u16 = 0x3F05;
const TAG_INDEX_SID: u16 = 0x3F06;
const TAG_BODY_SID: u16 = 0x3F07;
const TAG_SLICE_COUNT: u16 = 0x3F08;
const TAG_POS_TABLE_COUNT: u16 = 0x3F0E;
const TAG_DELTA_ENTRY_ARRAY: u16 = 0x3F09;
const TAG_INDEX_ENTRY_ARRAY: u16 = 0x3F0A;

/// Byte offset of one sub-element within an edit unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaEntry {
    pub pos_table_index: i8,
    pub slice: u8,
    pub element_data: u32,
}

const DELTA_ENTRY_LEN: u32 = 6;

/// Position information for one edit unit.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub temporal_offset: i8,
    pub key_frame_offset: i8,
    pub flags: u8,
    pub stream_offset: u64,
    pub slice_offsets: Vec<u32>,
    pub pos_table: Vec<Rational>,
}

impl IndexEntry {
    /// Entry with no slice or pos-table data; `flags` 0x80 marks random
    /// access.
    pub fn at_offset(stream_offset: u64, flags: u8) -> Self {
        IndexEntry {
            temporal_offset: 0,
            key_frame_offset: 0,
            flags,
            stream_offset,
            slice_offsets: Vec::new(),
            pos_table: Vec::new(),
        }
    }
}

/// One index table segment.
#[derive(Debug, Clone)]
#[must_use]
pub struct IndexTableSegment {
    pub instance_uid: Uuid,
    pub index_edit_rate: Rational,
    pub index_start_position: i64,
    pub index_duration: i64,
    /// 0 means VBR: per-entry stream offsets are required.
    pub edit_unit_byte_count: u32,
    pub index_sid: u32,
    pub body_sid: u32,
    pub slice_count: u8,
    pub pos_table_count: u8,
    pub delta_entries: Vec<DeltaEntry>,
    pub index_entries: Vec<IndexEntry>,
}

impl Default for IndexTableSegment {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexTableSegment {
    pub fn new() -> Self {
        IndexTableSegment {
            instance_uid: Uuid::new_v4(),
            index_edit_rate: Rational::new(0, 1),
            index_start_position: 0,
            index_duration: 0,
            edit_unit_byte_count: 0,
            index_sid: 0,
            body_sid: 0,
            slice_count: 0,
            pos_table_count: 0,
            delta_entries: Vec::new(),
            index_entries: Vec::new(),
        }
    }

    pub fn append_delta_entry(&mut self, pos_table_index: i8, slice: u8, element_data: u32) {
        self.delta_entries.push(DeltaEntry {
            pos_table_index,
            slice,
            element_data,
        });
    }

    pub fn append_index_entry(&mut self, entry: IndexEntry) {
        self.index_entries.push(entry);
    }

    pub fn increment_index_duration(&mut self) {
        self.index_duration += 1;
    }

    /// Encoded size of one index entry given the current slice and
    /// pos-table counts.
    fn index_entry_len(&self) -> u32 {
        11 + 4 * u32::from(self.slice_count) + 8 * u32::from(self.pos_table_count)
    }

    /// Fixed items present in every segment: instance UID through pos table
    /// count, each with its 4-byte tag/length header.
    const FIXED_ITEMS_LEN: u64 = 90;

    fn value_len(&self, num_delta: u32, num_index: u32) -> u64 {
        let mut len = Self::FIXED_ITEMS_LEN;
        if num_delta > 0 {
            len += 4 + 8 + u64::from(DELTA_ENTRY_LEN) * u64::from(num_delta);
        }
        if num_index > 0 {
            len += 4 + 8 + u64::from(self.index_entry_len()) * u64::from(num_index);
        }
        len
    }

    fn write_fixed_items<S: Write + Seek>(&self, stream: &mut MxfStream<S>) -> Result<()> {
        stream.write_u16(TAG_INSTANCE_UID)?;
        stream.write_u16(16)?;
        stream.write_all_bytes(self.instance_uid.as_bytes())?;

        stream.write_u16(TAG_INDEX_EDIT_RATE)?;
        stream.write_u16(8)?;
        stream.write_rational(self.index_edit_rate)?;

        stream.write_u16(TAG_INDEX_START_POSITION)?;
        stream.write_u16(8)?;
        stream.write_i64(self.index_start_position)?;

        stream.write_u16(TAG_INDEX_DURATION)?;
        stream.write_u16(8)?;
        stream.write_i64(self.index_duration)?;

        stream.write_u16(TAG_EDIT_UNIT_BYTE_COUNT)?;
        stream.write_u16(4)?;
        stream.write_u32(self.edit_unit_byte_count)?;

        stream.write_u16(TAG_INDEX_SID)?;
        stream.write_u16(4)?;
        stream.write_u32(self.index_sid)?;

        stream.write_u16(TAG_BODY_SID)?;
        stream.write_u16(4)?;
        stream.write_u32(self.body_sid)?;

        stream.write_u16(TAG_SLICE_COUNT)?;
        stream.write_u16(1)?;
        stream.write_u8(self.slice_count)?;

        stream.write_u16(TAG_POS_TABLE_COUNT)?;
        stream.write_u16(1)?;
        stream.write_u8(self.pos_table_count)?;
        Ok(())
    }

    /// Monolithic write: one local set carrying the in-memory entry arrays,
    /// then a position filler or KAG filler. Index markers are applied to
    /// `partition` so completion can derive the index byte count.
    pub fn write<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        partition: &mut Partition,
        fill_to: Option<u64>,
    ) -> Result<()> {
        let num_delta = self.delta_entries.len() as u32;
        let num_index = self.index_entries.len() as u32;
        let delta_item_len = 8 + DELTA_ENTRY_LEN as usize * self.delta_entries.len();
        if delta_item_len > u16::MAX as usize {
            return Err(Error::IndexItemTooLarge {
                tag: TAG_DELTA_ENTRY_ARRAY,
                len: delta_item_len,
            });
        }
        let index_item_len = 8 + self.index_entry_len() as usize * self.index_entries.len();
        if index_item_len > u16::MAX as usize {
            return Err(Error::IndexItemTooLarge {
                tag: TAG_INDEX_ENTRY_ARRAY,
                len: index_item_len,
            });
        }

        partition.mark_index_start(stream)?;
        stream.write_kl(&keys::INDEX_TABLE_SEGMENT, self.value_len(num_delta, num_index))?;
        self.write_fixed_items(stream)?;

        if num_delta > 0 {
            self.write_delta_entry_array_header(stream, num_delta)?;
            for entry in &self.delta_entries {
                self.write_delta_entry(stream, *entry)?;
            }
        }
        if num_index > 0 {
            self.write_index_entry_array_header(stream, num_index)?;
            for entry in &self.index_entries {
                self.write_index_entry(stream, entry)?;
            }
        }

        match fill_to {
            Some(position) => stream.fill_to_position(position)?,
            None => partition.fill_to_kag(stream)?,
        }
        partition.mark_index_end(stream)
    }

    /// Streamed write, step 1: the set KL sized for `num_delta` delta
    /// entries and `num_index` index entries, followed by the fixed items.
    /// The caller then streams the array headers and entries and is
    /// responsible for the partition index markers.
    pub fn write_header<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        num_delta: u32,
        num_index: u32,
    ) -> Result<()> {
        stream.write_kl(&keys::INDEX_TABLE_SEGMENT, self.value_len(num_delta, num_index))?;
        self.write_fixed_items(stream)
    }

    /// Delta entry array item header. The item length is truncated to 16
    /// bits; the array header carries the true count.
    pub fn write_delta_entry_array_header<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        num_delta: u32,
    ) -> Result<()> {
        stream.write_u16(TAG_DELTA_ENTRY_ARRAY)?;
        stream.write_u16((8 + DELTA_ENTRY_LEN * num_delta) as u16)?;
        stream.write_array_header(num_delta, DELTA_ENTRY_LEN)
    }

    pub fn write_delta_entry<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        entry: DeltaEntry,
    ) -> Result<()> {
        stream.write_i8(entry.pos_table_index)?;
        stream.write_u8(entry.slice)?;
        stream.write_u32(entry.element_data)
    }

    /// Index entry array item header; errors when the item would not fit
    /// the 16-bit length field. Large VBR tables use the Avid variant.
    pub fn write_index_entry_array_header<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        num_index: u32,
    ) -> Result<()> {
        let item_len = 8 + self.index_entry_len() as usize * num_index as usize;
        if item_len > u16::MAX as usize {
            return Err(Error::IndexItemTooLarge {
                tag: TAG_INDEX_ENTRY_ARRAY,
                len: item_len,
            });
        }
        stream.write_u16(TAG_INDEX_ENTRY_ARRAY)?;
        stream.write_u16(item_len as u16)?;
        stream.write_array_header(num_index, self.index_entry_len())
    }

    /// Avid index entry array item header: the 16-bit item length wraps,
    /// the array header count is authoritative.
    pub fn write_avid_index_entry_array_header<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        num_index: u32,
    ) -> Result<()> {
        let item_len = 8u64 + u64::from(self.index_entry_len()) * u64::from(num_index);
        stream.write_u16(TAG_INDEX_ENTRY_ARRAY)?;
        stream.write_u16(item_len as u16)?;
        stream.write_array_header(num_index, self.index_entry_len())
    }

    pub fn write_index_entry<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        entry: &IndexEntry,
    ) -> Result<()> {
        stream.write_i8(entry.temporal_offset)?;
        stream.write_i8(entry.key_frame_offset)?;
        stream.write_u8(entry.flags)?;
        stream.write_u64(entry.stream_offset)?;
        for offset in &entry.slice_offsets {
            stream.write_u32(*offset)?;
        }
        for pos in &entry.pos_table {
            stream.write_rational(*pos)?;
        }
        Ok(())
    }

    /// Parse a segment whose KL has already been read and validated.
    /// Accepts both the monolithic and the streamed/Avid layouts.
    pub fn read<S: Read + Seek>(stream: &mut MxfStream<S>, len: u64) -> Result<Self> {
        let value = stream.read_vec(len as usize)?;
        let mut r = Cursor::new(value.as_slice());
        let mut segment = IndexTableSegment::new();

        while (r.position() as usize) + 4 <= value.len() {
            let tag = r.read_u16::<BigEndian>()?;
            let item_len = r.read_u16::<BigEndian>()? as usize;
            match tag {
                TAG_INSTANCE_UID => {
                    let mut uid = [0u8; 16];
                    r.read_exact(&mut uid)?;
                    segment.instance_uid = Uuid::from_bytes(uid);
                }
                TAG_INDEX_EDIT_RATE => {
                    segment.index_edit_rate = Rational::new(
                        r.read_i32::<BigEndian>()?,
                        r.read_i32::<BigEndian>()?,
                    );
                }
                TAG_INDEX_START_POSITION => {
                    segment.index_start_position = r.read_i64::<BigEndian>()?;
                }
                TAG_INDEX_DURATION => segment.index_duration = r.read_i64::<BigEndian>()?,
                TAG_EDIT_UNIT_BYTE_COUNT => {
                    segment.edit_unit_byte_count = r.read_u32::<BigEndian>()?;
                }
                TAG_INDEX_SID => segment.index_sid = r.read_u32::<BigEndian>()?,
                TAG_BODY_SID => segment.body_sid = r.read_u32::<BigEndian>()?,
                TAG_SLICE_COUNT => segment.slice_count = ReadBytesExt::read_u8(&mut r)?,
                TAG_POS_TABLE_COUNT => segment.pos_table_count = ReadBytesExt::read_u8(&mut r)?,
                TAG_DELTA_ENTRY_ARRAY => {
                    // sized by the array header, not the 16-bit item length
                    let count = r.read_u32::<BigEndian>()?;
                    let element_len = r.read_u32::<BigEndian>()? as usize;
                    if element_len < DELTA_ENTRY_LEN as usize {
                        return Err(Error::InvalidItemLength {
                            tag,
                            len: element_len,
                        });
                    }
                    for _ in 0..count {
                        let pos_table_index = ReadBytesExt::read_i8(&mut r)?;
                        let slice = ReadBytesExt::read_u8(&mut r)?;
                        let element_data = r.read_u32::<BigEndian>()?;
                        segment.delta_entries.push(DeltaEntry {
                            pos_table_index,
                            slice,
                            element_data,
                        });
                        r.set_position(r.position() + (element_len - DELTA_ENTRY_LEN as usize) as u64);
                    }
                }
                TAG_INDEX_ENTRY_ARRAY => {
                    let count = r.read_u32::<BigEndian>()?;
                    let element_len = r.read_u32::<BigEndian>()? as usize;
                    let expected = segment.index_entry_len() as usize;
                    if element_len < expected {
                        return Err(Error::InvalidItemLength {
                            tag,
                            len: element_len,
                        });
                    }
                    for _ in 0..count {
                        let temporal_offset = ReadBytesExt::read_i8(&mut r)?;
                        let key_frame_offset = ReadBytesExt::read_i8(&mut r)?;
                        let flags = ReadBytesExt::read_u8(&mut r)?;
                        let stream_offset = r.read_u64::<BigEndian>()?;
                        let mut slice_offsets = Vec::with_capacity(segment.slice_count as usize);
                        for _ in 0..segment.slice_count {
                            slice_offsets.push(r.read_u32::<BigEndian>()?);
                        }
                        let mut pos_table = Vec::with_capacity(segment.pos_table_count as usize);
                        for _ in 0..segment.pos_table_count {
                            pos_table.push(Rational::new(
                                r.read_i32::<BigEndian>()?,
                                r.read_i32::<BigEndian>()?,
                            ));
                        }
                        segment.index_entries.push(IndexEntry {
                            temporal_offset,
                            key_frame_offset,
                            flags,
                            stream_offset,
                            slice_offsets,
                            pos_table,
                        });
                        r.set_position(r.position() + (element_len - expected) as u64);
                    }
                }
                _ => {
                    r.set_position(r.position() + item_len as u64);
                }
            }
        }
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PartitionKind, PartitionStatus};
    use std::io::Cursor as IoCursor;

    fn sample_segment() -> IndexTableSegment {
        let mut segment = IndexTableSegment::new();
        segment.index_edit_rate = Rational::new(25, 1);
        segment.index_duration = 3;
        segment.edit_unit_byte_count = 0x1000;
        segment.index_sid = 2;
        segment.body_sid = 1;
        segment.append_delta_entry(0, 0, 0);
        segment.append_delta_entry(0, 0, 48);
        segment
    }

    fn write_read(segment: &IndexTableSegment) -> IndexTableSegment {
        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        let mut partition = Partition::new(PartitionKind::Header, PartitionStatus::ClosedComplete);
        segment.write(&mut stream, &mut partition, None).unwrap();

        stream.seek_to(0).unwrap();
        let (key, _, len) = stream.read_kl().unwrap();
        assert!(keys::is_index_table_segment(&key));
        IndexTableSegment::read(&mut stream, len).unwrap()
    }

    #[test]
    fn monolithic_round_trip() {
        let segment = sample_segment();
        let read = write_read(&segment);
        assert_eq!(read.instance_uid, segment.instance_uid);
        assert_eq!(read.index_edit_rate, segment.index_edit_rate);
        assert_eq!(read.index_duration, 3);
        assert_eq!(read.edit_unit_byte_count, 0x1000);
        assert_eq!(read.delta_entries, segment.delta_entries);
        assert!(read.index_entries.is_empty());
    }

    #[test]
    fn vbr_entries_round_trip() {
        let mut segment = sample_segment();
        segment.edit_unit_byte_count = 0;
        for i in 0..10u64 {
            segment.append_index_entry(IndexEntry::at_offset(i * 100, 0x80));
        }
        let read = write_read(&segment);
        assert_eq!(read.index_entries.len(), 10);
        assert_eq!(read.index_entries[9].stream_offset, 900);
        assert_eq!(read.index_entries[9].flags, 0x80);
    }

    #[test]
    fn streamed_avid_layout_round_trip() {
        let mut segment = sample_segment();
        segment.delta_entries.truncate(1);
        segment.edit_unit_byte_count = 0;
        let count = 7000u32; // item length would overflow 16 bits

        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        segment.write_header(&mut stream, 1, count).unwrap();
        segment.write_delta_entry_array_header(&mut stream, 1).unwrap();
        segment
            .write_delta_entry(&mut stream, segment.delta_entries[0])
            .unwrap();
        segment
            .write_avid_index_entry_array_header(&mut stream, count)
            .unwrap();
        for i in 0..count {
            segment
                .write_index_entry(&mut stream, &IndexEntry::at_offset(u64::from(i) * 8, 0x80))
                .unwrap();
        }

        stream.seek_to(0).unwrap();
        let (key, _, len) = stream.read_kl().unwrap();
        assert!(keys::is_index_table_segment(&key));
        let read = IndexTableSegment::read(&mut stream, len).unwrap();
        assert_eq!(read.delta_entries.len(), 1);
        assert_eq!(read.index_entries.len(), count as usize);
        assert!(read
            .index_entries
            .windows(2)
            .all(|w| w[0].stream_offset < w[1].stream_offset));
    }

    #[test]
    fn monolithic_rejects_oversize_entry_array() {
        let mut segment = sample_segment();
        for i in 0..7000u64 {
            segment.append_index_entry(IndexEntry::at_offset(i, 0));
        }
        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        let mut partition = Partition::new(PartitionKind::Footer, PartitionStatus::ClosedComplete);
        assert!(matches!(
            segment.write(&mut stream, &mut partition, None),
            Err(Error::IndexItemTooLarge { .. })
        ));
    }
}
