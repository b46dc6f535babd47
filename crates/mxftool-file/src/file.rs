//! Envelope over a random-access byte stream.

use std::io::{Read, Seek, Write};

use mxftool_core::{
    IndexTableSegment, MxfStream, Partition, PartitionKind, PartitionStatus, RandomIndexPack,
    KEY_SIZE,
};
use mxftool_meta::HeaderMetadata;
use tracing::debug;

use crate::{Error, Result};

/// Maximum run-in preceding the header partition pack.
const MAX_RUNIN: usize = 64 * 1024;

/// An MXF file: the stream, the partitions in creation order, and the
/// completion logic that keeps their back-references consistent.
#[must_use]
pub struct MxfFile<S> {
    stream: MxfStream<S>,
    partitions: Vec<Partition>,
}

impl<S> MxfFile<S> {
    /// Wrap a stream; used for both reading and writing sessions.
    pub fn new(inner: S) -> Self {
        MxfFile {
            stream: MxfStream::new(inner),
            partitions: Vec::new(),
        }
    }

    pub fn stream(&mut self) -> &mut MxfStream<S> {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition(&self, index: usize) -> &Partition {
        &self.partitions[index]
    }

    pub fn partition_mut(&mut self, index: usize) -> &mut Partition {
        &mut self.partitions[index]
    }
}

impl<S: Write + Seek> MxfFile<S> {
    /// Append a new partition, inheriting the file-wide fields of the
    /// previous one. Returns its index; write it with
    /// [`MxfFile::write_partition`] once its fields are set.
    pub fn create_partition(&mut self, kind: PartitionKind, status: PartitionStatus) -> usize {
        let partition = match self.partitions.last() {
            Some(previous) => Partition::with_previous(previous, kind, status),
            None => Partition::new(kind, status),
        };
        self.partitions.push(partition);
        self.partitions.len() - 1
    }

    /// Write partition `index` at the current stream position.
    pub fn write_partition(&mut self, index: usize) -> Result<()> {
        let partition = self
            .partitions
            .get_mut(index)
            .ok_or(Error::PartitionIndex(index))?;
        partition.write(&mut self.stream)?;
        debug!(
            index,
            offset = partition.this_partition,
            kind = ?partition.kind,
            "wrote partition pack"
        );
        Ok(())
    }

    /// Write the RIP listing every partition, at the current position.
    pub fn write_rip(&mut self) -> Result<()> {
        RandomIndexPack::from_partitions(&self.partitions).write(&mut self.stream)?;
        Ok(())
    }

    /// Propagate the final this/previous/footer offsets into every
    /// partition pack and re-write them in place. The stream position is
    /// preserved.
    pub fn update_partitions(&mut self) -> Result<()> {
        let footer = match self.partitions.last() {
            Some(last) if last.kind == PartitionKind::Footer => last.this_partition,
            _ => 0,
        };
        let position = self.stream.position()?;
        for index in 0..self.partitions.len() {
            let previous = if index == 0 {
                0
            } else {
                self.partitions[index - 1].this_partition
            };
            let partition = &mut self.partitions[index];
            partition.previous_partition = previous;
            partition.footer_partition = footer;
            partition.rewrite(&mut self.stream)?;
        }
        self.stream.seek_to(position)?;
        debug!(partitions = self.partitions.len(), footer, "updated partition packs");
        Ok(())
    }

    /// Record the start of partition `index`'s index table region.
    pub fn mark_index_start(&mut self, index: usize) -> Result<()> {
        let partition = self
            .partitions
            .get_mut(index)
            .ok_or(Error::PartitionIndex(index))?;
        partition.mark_index_start(&mut self.stream)?;
        Ok(())
    }

    /// Record the end of partition `index`'s index table region.
    pub fn mark_index_end(&mut self, index: usize) -> Result<()> {
        let partition = self
            .partitions
            .get_mut(index)
            .ok_or(Error::PartitionIndex(index))?;
        partition.mark_index_end(&mut self.stream)?;
        Ok(())
    }

    /// Pad to the KAG boundary of partition `index`.
    pub fn fill_to_kag(&mut self, index: usize) -> Result<()> {
        let partition = self
            .partitions
            .get(index)
            .ok_or(Error::PartitionIndex(index))?;
        partition.fill_to_kag(&mut self.stream)?;
        Ok(())
    }

    /// Serialize header metadata into partition `index`, applying the
    /// header markers and the trailing filler (absolute position or KAG).
    pub fn write_header_metadata(
        &mut self,
        metadata: &HeaderMetadata,
        index: usize,
        fill_to: Option<u64>,
    ) -> Result<()> {
        let partition = self
            .partitions
            .get_mut(index)
            .ok_or(Error::PartitionIndex(index))?;
        metadata.write(&mut self.stream, partition, fill_to)?;
        Ok(())
    }

    /// Write a monolithic index table segment into partition `index`.
    pub fn write_index_segment(
        &mut self,
        segment: &IndexTableSegment,
        index: usize,
        fill_to: Option<u64>,
    ) -> Result<()> {
        let partition = self
            .partitions
            .get_mut(index)
            .ok_or(Error::PartitionIndex(index))?;
        segment.write(&mut self.stream, partition, fill_to)?;
        Ok(())
    }
}

impl<S: Read + Seek> MxfFile<S> {
    /// Locate and read the header partition pack, searching past up to
    /// 64 KiB of run-in. On success the partition list holds exactly the
    /// header partition and the stream is positioned after the pack.
    pub fn read_header_partition(&mut self) -> Result<()> {
        self.partitions.clear();
        self.stream.seek_to(0)?;
        let limit = (MAX_RUNIN + KEY_SIZE).min(self.stream.len()? as usize);
        let mut buf = vec![0u8; limit];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stream.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        let runin = buf
            .windows(KEY_SIZE)
            .position(|window| {
                mxftool_core::Ul::from_bytes(window)
                    .map(|key| Partition::is_header_key(&key))
                    .unwrap_or(false)
            })
            .ok_or(mxftool_core::Error::HeaderPartitionNotFound)?;

        self.stream.set_runin(runin as u64);
        self.stream.seek_to(runin as u64)?;
        let (key, _, len) = self.stream.read_kl()?;
        let partition = Partition::read(&mut self.stream, &key, len)?;
        debug!(runin, "read header partition");
        self.partitions.push(partition);
        Ok(())
    }

    /// Read every partition pack: via the RIP when the file has one, else
    /// by walking the footer back-chain. On failure the partition list is
    /// restored to just the header partition.
    pub fn read_partitions(&mut self) -> Result<()> {
        let have_header = self
            .partitions
            .first()
            .map(|p| p.kind == PartitionKind::Header)
            .unwrap_or(false);
        if !have_header {
            self.read_header_partition()?;
        }
        let header = self.partitions[0].clone();
        match self.read_partitions_inner(&header) {
            Ok(partitions) => {
                self.partitions = partitions;
                Ok(())
            }
            Err(err) => {
                self.partitions = vec![header];
                Err(err)
            }
        }
    }

    fn read_partitions_inner(&mut self, header: &Partition) -> Result<Vec<Partition>> {
        let runin = self.stream.runin();
        if let Ok(rip) = RandomIndexPack::read(&mut self.stream) {
            let mut partitions = vec![header.clone()];
            for entry in &rip.entries {
                if entry.this_partition <= header.this_partition {
                    continue;
                }
                self.stream.seek_to(runin + entry.this_partition)?;
                let (key, _, len) = self.stream.read_kl()?;
                partitions.push(Partition::read(&mut self.stream, &key, len)?);
            }
            return Ok(partitions);
        }

        // no RIP: walk from the footer back to the header
        let mut this = header.footer_partition;
        if this <= header.this_partition {
            return Err(Error::BrokenPartitionChain);
        }
        let mut partitions = Vec::new();
        loop {
            self.stream.seek_to(runin + this)?;
            let (key, _, len) = self.stream.read_kl()?;
            partitions.push(Partition::read(&mut self.stream, &key, len)?);
            let last = partitions.last().expect("just pushed");
            let previous = last.previous_partition;
            if previous >= last.this_partition || previous <= header.this_partition {
                break;
            }
            this = previous;
        }
        partitions.push(header.clone());
        partitions.reverse();
        Ok(partitions)
    }

    /// Read the header metadata block of partition `index`. The stream
    /// must be positioned after that partition's pack; returns the file
    /// position where the block starts.
    pub fn read_header_metadata(
        &mut self,
        metadata: &mut HeaderMetadata,
        index: usize,
    ) -> Result<u64> {
        let partition = self
            .partitions
            .get(index)
            .ok_or(Error::PartitionIndex(index))?
            .clone();
        let (key, llen, len) = self.stream.read_next_nonfiller_kl()?;
        let start = self.stream.position()? - u64::from(llen) - KEY_SIZE as u64;
        metadata.read(&mut self.stream, &partition, &key, llen, len)?;
        Ok(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxftool_core::Ul;
    use std::io::Cursor;

    fn new_file() -> MxfFile<Cursor<Vec<u8>>> {
        let mut file = MxfFile::new(Cursor::new(Vec::new()));
        file.stream().set_min_llen(4).unwrap();
        file
    }

    fn write_two_partition_file() -> MxfFile<Cursor<Vec<u8>>> {
        let mut file = new_file();
        let header = file.create_partition(PartitionKind::Header, PartitionStatus::ClosedComplete);
        file.partition_mut(header).body_sid = 1;
        file.partition_mut(header).operational_pattern = Ul([0xAA; 16]);
        file.write_partition(header).unwrap();

        file.stream().write_zeros(256).unwrap();

        let footer = file.create_partition(PartitionKind::Footer, PartitionStatus::ClosedComplete);
        file.write_partition(footer).unwrap();
        file.write_rip().unwrap();
        file.update_partitions().unwrap();
        file
    }

    #[test]
    fn back_references_are_consistent() {
        let file = write_two_partition_file();
        let partitions = file.partitions();
        assert_eq!(partitions.len(), 2);
        let footer_offset = partitions[1].this_partition;
        assert_eq!(partitions[0].previous_partition, 0);
        assert_eq!(partitions[0].footer_partition, footer_offset);
        assert_eq!(partitions[1].previous_partition, partitions[0].this_partition);
        assert_eq!(partitions[1].footer_partition, footer_offset);
        // footer inherits the operational pattern from the header
        assert_eq!(partitions[1].operational_pattern, Ul([0xAA; 16]));
    }

    #[test]
    fn partitions_read_back_via_rip() {
        let file = write_two_partition_file();
        let bytes = file.into_inner().into_inner();

        let mut read = MxfFile::new(Cursor::new(bytes));
        read.read_partitions().unwrap();
        assert_eq!(read.partitions().len(), 2);
        assert_eq!(read.partitions()[0].kind, PartitionKind::Header);
        assert_eq!(read.partitions()[1].kind, PartitionKind::Footer);
        assert!(read.partitions()[0].this_partition < read.partitions()[1].this_partition);
    }

    #[test]
    fn partitions_read_back_via_footer_chain() {
        let file = write_two_partition_file();
        let mut bytes = file.into_inner().into_inner();
        // truncate the RIP so the reader has to walk the back-chain
        let rip_len =
            u32::from_be_bytes(bytes[bytes.len() - 4..].try_into().unwrap()) as usize;
        bytes.truncate(bytes.len() - rip_len);

        let mut read = MxfFile::new(Cursor::new(bytes));
        read.read_partitions().unwrap();
        assert_eq!(read.partitions().len(), 2);
        assert_eq!(read.partitions()[1].kind, PartitionKind::Footer);
    }

    #[test]
    fn header_partition_found_behind_runin() {
        let file = write_two_partition_file();
        let bytes = file.into_inner().into_inner();
        let mut with_runin = vec![0x55u8; 100];
        with_runin.extend_from_slice(&bytes);

        let mut read = MxfFile::new(Cursor::new(with_runin));
        read.read_header_partition().unwrap();
        assert_eq!(read.stream().runin(), 100);
        assert_eq!(read.partitions()[0].this_partition, 0);
    }

    #[test]
    fn missing_header_partition_is_an_error() {
        let mut read = MxfFile::new(Cursor::new(vec![0u8; 2048]));
        assert!(read.read_header_partition().is_err());
    }
}
