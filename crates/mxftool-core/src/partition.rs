//! Partition packs and KAG alignment.
//!
//! A partition pack is a KLV whose key encodes the partition status in
//! octet 13 (open/closed x incomplete/complete, values 2-5) and the kind in
//! octet 14 (header = 2, body = 3, footer = 4). The value is a fixed-order
//! field sequence ending with a batch of essence container labels.
//!
//! The KLV alignment grid (KAG) is relative to the first byte of the
//! partition pack key: content following the pack is padded with fillers so
//! that the next record starts on a grid boundary.

use std::io::{Cursor, Read, Seek, Write};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{keys, Error, Key, MxfStream, Result, Ul, KEY_SIZE};

/// Header/body/footer, from key octet 14.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Header = 2,
    Body = 3,
    Footer = 4,
}

/// Open/closed and complete/incomplete, from key octet 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStatus {
    OpenIncomplete = 2,
    ClosedIncomplete = 3,
    OpenComplete = 4,
    ClosedComplete = 5,
}

/// One partition pack plus the file-position markers used on completion to
/// compute the header and index byte counts.
#[derive(Debug, Clone)]
#[must_use]
pub struct Partition {
    pub kind: PartitionKind,
    pub status: PartitionStatus,
    pub major_version: u16,
    pub minor_version: u16,
    pub kag_size: u32,
    pub this_partition: u64,
    pub previous_partition: u64,
    pub footer_partition: u64,
    pub header_byte_count: u64,
    pub index_byte_count: u64,
    pub index_sid: u32,
    pub body_offset: u64,
    pub body_sid: u32,
    pub operational_pattern: Ul,
    pub essence_containers: Vec<Ul>,
    header_mark: Option<u64>,
    index_mark: Option<u64>,
}

impl Partition {
    pub fn new(kind: PartitionKind, status: PartitionStatus) -> Self {
        Partition {
            kind,
            status,
            major_version: 1,
            minor_version: 2,
            kag_size: 1,
            this_partition: 0,
            previous_partition: 0,
            footer_partition: 0,
            header_byte_count: 0,
            index_byte_count: 0,
            index_sid: 0,
            body_offset: 0,
            body_sid: 0,
            operational_pattern: Ul([0u8; 16]),
            essence_containers: Vec::new(),
            header_mark: None,
            index_mark: None,
        }
    }

    /// New partition inheriting the file-wide fields of `previous`.
    pub fn with_previous(previous: &Partition, kind: PartitionKind, status: PartitionStatus) -> Self {
        let mut partition = Partition::new(kind, status);
        partition.major_version = previous.major_version;
        partition.minor_version = previous.minor_version;
        partition.kag_size = previous.kag_size;
        partition.operational_pattern = previous.operational_pattern;
        partition.essence_containers = previous.essence_containers.clone();
        partition
    }

    /// True if `key` carries the partition pack prefix.
    pub fn is_partition_key(key: &Key) -> bool {
        key.has_prefix(&keys::PARTITION_PACK_PREFIX)
    }

    /// True if `key` is a header partition pack of any status.
    pub fn is_header_key(key: &Key) -> bool {
        matches!(Self::parse_key(key), Ok((PartitionKind::Header, _)))
    }

    /// Decode kind and status from a partition pack key.
    pub fn parse_key(key: &Key) -> Result<(PartitionKind, PartitionStatus)> {
        if !Self::is_partition_key(key) {
            return Err(Error::NotAPartitionKey(*key));
        }
        let status = match key.0[13] {
            2 => PartitionStatus::OpenIncomplete,
            3 => PartitionStatus::ClosedIncomplete,
            4 => PartitionStatus::OpenComplete,
            5 => PartitionStatus::ClosedComplete,
            _ => return Err(Error::NotAPartitionKey(*key)),
        };
        let kind = match key.0[14] {
            2 => PartitionKind::Header,
            3 => PartitionKind::Body,
            4 => PartitionKind::Footer,
            _ => return Err(Error::NotAPartitionKey(*key)),
        };
        Ok((kind, status))
    }

    /// The pack key for this partition's kind and status.
    pub fn key(&self) -> Key {
        let mut key = [0u8; 16];
        key[..13].copy_from_slice(&keys::PARTITION_PACK_PREFIX);
        key[13] = self.status as u8;
        key[14] = self.kind as u8;
        Ul(key)
    }

    pub fn add_essence_container(&mut self, label: Ul) {
        self.essence_containers.push(label);
    }

    fn value_len(&self) -> u64 {
        // fixed fields + operational pattern + essence container batch
        88 + 16 * self.essence_containers.len() as u64
    }

    fn write_value<S: Write + Seek>(&self, stream: &mut MxfStream<S>) -> Result<()> {
        stream.write_u16(self.major_version)?;
        stream.write_u16(self.minor_version)?;
        stream.write_u32(self.kag_size)?;
        stream.write_u64(self.this_partition)?;
        stream.write_u64(self.previous_partition)?;
        stream.write_u64(self.footer_partition)?;
        stream.write_u64(self.header_byte_count)?;
        stream.write_u64(self.index_byte_count)?;
        stream.write_u32(self.index_sid)?;
        stream.write_u64(self.body_offset)?;
        stream.write_u32(self.body_sid)?;
        stream.write_key(&self.operational_pattern)?;
        stream.write_batch_header(self.essence_containers.len() as u32, 16)?;
        for label in &self.essence_containers {
            stream.write_key(label)?;
        }
        Ok(())
    }

    /// Write the pack at the current position, record `this_partition`, and
    /// pad to the KAG.
    pub fn write<S: Write + Seek>(&mut self, stream: &mut MxfStream<S>) -> Result<()> {
        let position = stream.position()?;
        self.this_partition = position - stream.runin();
        stream.write_kl(&self.key(), self.value_len())?;
        self.write_value(stream)?;
        self.fill_to_kag(stream)
    }

    /// Re-write the pack at its recorded position; the caller restores the
    /// stream position afterwards. The pack size is stable because the
    /// length width and the essence container count are unchanged.
    pub fn rewrite<S: Write + Seek>(&self, stream: &mut MxfStream<S>) -> Result<()> {
        let runin = stream.runin();
        stream.seek_to(runin + self.this_partition)?;
        stream.write_kl(&self.key(), self.value_len())?;
        self.write_value(stream)
    }

    /// Parse a partition pack whose KL has already been read.
    pub fn read<S: Read + Seek>(stream: &mut MxfStream<S>, key: &Key, len: u64) -> Result<Partition> {
        let (kind, status) = Self::parse_key(key)?;
        let value = stream.read_vec(len as usize)?;
        if value.len() < 88 {
            return Err(Error::UnexpectedEof {
                need: 88,
                have: value.len(),
            });
        }
        let mut r = Cursor::new(value.as_slice());
        let mut partition = Partition::new(kind, status);
        partition.major_version = r.read_u16::<BigEndian>()?;
        partition.minor_version = r.read_u16::<BigEndian>()?;
        partition.kag_size = r.read_u32::<BigEndian>()?;
        partition.this_partition = r.read_u64::<BigEndian>()?;
        partition.previous_partition = r.read_u64::<BigEndian>()?;
        partition.footer_partition = r.read_u64::<BigEndian>()?;
        partition.header_byte_count = r.read_u64::<BigEndian>()?;
        partition.index_byte_count = r.read_u64::<BigEndian>()?;
        partition.index_sid = r.read_u32::<BigEndian>()?;
        partition.body_offset = r.read_u64::<BigEndian>()?;
        partition.body_sid = r.read_u32::<BigEndian>()?;
        let mut op = [0u8; 16];
        r.read_exact(&mut op)?;
        partition.operational_pattern = Ul(op);
        let count = r.read_u32::<BigEndian>()?;
        let element_length = r.read_u32::<BigEndian>()?;
        if element_length as usize != KEY_SIZE && count > 0 {
            return Err(Error::InvalidItemLength {
                tag: 0,
                len: element_length as usize,
            });
        }
        for _ in 0..count {
            let mut label = [0u8; 16];
            r.read_exact(&mut label)?;
            partition.essence_containers.push(Ul(label));
        }
        Ok(partition)
    }

    /// Record the start of this partition's header metadata.
    pub fn mark_header_start<S: Seek>(&mut self, stream: &mut MxfStream<S>) -> Result<()> {
        self.header_mark = Some(stream.position()?);
        Ok(())
    }

    /// Record the end of the header metadata (including trailing filler) and
    /// derive `header_byte_count`.
    pub fn mark_header_end<S: Seek>(&mut self, stream: &mut MxfStream<S>) -> Result<()> {
        let start = self.header_mark.expect("header start not marked");
        self.header_byte_count = stream.position()? - start;
        Ok(())
    }

    /// Record the start of this partition's index table segments.
    pub fn mark_index_start<S: Seek>(&mut self, stream: &mut MxfStream<S>) -> Result<()> {
        self.index_mark = Some(stream.position()?);
        Ok(())
    }

    /// Record the end of the index table (including trailing filler) and
    /// derive `index_byte_count`.
    pub fn mark_index_end<S: Seek>(&mut self, stream: &mut MxfStream<S>) -> Result<()> {
        let start = self.index_mark.expect("index start not marked");
        self.index_byte_count = stream.position()? - start;
        Ok(())
    }

    /// Pad with a filler so the next byte lands on a KAG boundary relative
    /// to the start of this partition. When the gap is smaller than the
    /// minimum filler KLV, a whole extra KAG is allocated; shrink-on-rewrite
    /// depends on the reserved region staying fillable.
    pub fn fill_to_kag<S: Write + Seek>(&self, stream: &mut MxfStream<S>) -> Result<()> {
        if self.kag_size <= 1 {
            return Ok(());
        }
        let relative = stream.position()? - stream.runin() - self.this_partition;
        let offset = relative % u64::from(self.kag_size);
        if offset == 0 {
            return Ok(());
        }
        let mut fill = u64::from(self.kag_size) - offset;
        let min_fill = KEY_SIZE as u64 + u64::from(stream.min_llen());
        if fill < min_fill {
            fill += u64::from(self.kag_size);
        }
        stream.write_fill(fill)
    }

    /// Reserve at least `space` bytes of filler, ending on a KAG boundary.
    pub fn allocate_space_to_kag<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        space: u32,
    ) -> Result<()> {
        let min_fill = KEY_SIZE as u64 + u64::from(stream.min_llen());
        let kag = u64::from(self.kag_size.max(1));
        let relative = stream.position()? - stream.runin() - self.this_partition;
        let mut fill = u64::from(space).max(min_fill);
        let rem = (relative + fill) % kag;
        if rem != 0 {
            fill += kag - rem;
        }
        stream.write_fill(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    fn sample_partition() -> Partition {
        let mut p = Partition::new(PartitionKind::Header, PartitionStatus::ClosedComplete);
        p.kag_size = 1;
        p.body_sid = 1;
        p.index_sid = 2;
        p.operational_pattern = Ul([0xAA; 16]);
        p.add_essence_container(Ul([0xBB; 16]));
        p.add_essence_container(Ul([0xCC; 16]));
        p
    }

    #[test]
    fn key_encodes_status_and_kind() {
        let p = sample_partition();
        let key = p.key();
        assert_eq!(key.0[13], 5);
        assert_eq!(key.0[14], 2);
        assert_eq!(Partition::parse_key(&key).unwrap(), (
            PartitionKind::Header,
            PartitionStatus::ClosedComplete
        ));
        assert!(Partition::is_header_key(&key));
    }

    #[test]
    fn pack_round_trip() {
        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        let mut p = sample_partition();
        p.write(&mut stream).unwrap();

        stream.seek_to(0).unwrap();
        let (key, _, len) = stream.read_kl().unwrap();
        let read = Partition::read(&mut stream, &key, len).unwrap();
        assert_eq!(read.kind, PartitionKind::Header);
        assert_eq!(read.status, PartitionStatus::ClosedComplete);
        assert_eq!(read.body_sid, 1);
        assert_eq!(read.index_sid, 2);
        assert_eq!(read.this_partition, 0);
        assert_eq!(read.essence_containers, p.essence_containers);
    }

    #[test]
    fn kag_fill_lands_on_boundary() {
        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        let mut p = sample_partition();
        p.kag_size = 0x100;
        p.write(&mut stream).unwrap();
        assert_eq!(stream.position().unwrap() % 0x100, 0);

        stream.write_zeros(10).unwrap();
        p.fill_to_kag(&mut stream).unwrap();
        assert_eq!(stream.position().unwrap() % 0x100, 0);
    }

    #[test]
    fn kag_fill_allocates_extra_grid_when_gap_too_small() {
        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        let mut p = sample_partition();
        p.kag_size = 32;
        p.write(&mut stream).unwrap();
        let base = stream.position().unwrap();
        // leave a 10-byte gap to the boundary, below the 20-byte minimum
        stream.write_zeros(22).unwrap();
        p.fill_to_kag(&mut stream).unwrap();
        let end = stream.position().unwrap();
        assert_eq!((end - p.this_partition) % 32, 0);
        assert_eq!(end - base - 22, 10 + 32);
    }

    #[test]
    fn allocate_space_ends_on_boundary() {
        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        let mut p = sample_partition();
        p.kag_size = 0x100;
        p.write(&mut stream).unwrap();
        let before = stream.position().unwrap();
        p.allocate_space_to_kag(&mut stream, 0x180).unwrap();
        let after = stream.position().unwrap();
        assert!(after - before >= 0x180);
        assert_eq!((after - p.this_partition) % 0x100, 0);
    }

    #[test]
    fn rewrite_is_size_stable() {
        let mut stream = MxfStream::new(IoCursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        let mut p = sample_partition();
        p.write(&mut stream).unwrap();
        let end = stream.position().unwrap();

        p.footer_partition = 0x1234;
        p.rewrite(&mut stream).unwrap();
        assert_eq!(stream.position().unwrap(), end);
    }
}
