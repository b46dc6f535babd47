//! Random Index Pack.
//!
//! The RIP is the final KLV of a file: one `(body SID, partition offset)`
//! entry per partition, terminated by a u32 holding the overall length of
//! the RIP KLV. Readers find it by probing the last four bytes.

use std::io::{Read, Seek, Write};

use crate::stream::ber_llen;
use crate::{keys, Error, MxfStream, Partition, Result, KEY_SIZE};

/// One RIP entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RipEntry {
    pub body_sid: u32,
    pub this_partition: u64,
}

const RIP_ENTRY_LEN: u64 = 12;

/// The file-tail partition directory.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RandomIndexPack {
    pub entries: Vec<RipEntry>,
}

impl RandomIndexPack {
    /// Build a RIP listing `partitions` in file order.
    pub fn from_partitions(partitions: &[Partition]) -> Self {
        RandomIndexPack {
            entries: partitions
                .iter()
                .map(|p| RipEntry {
                    body_sid: p.body_sid,
                    this_partition: p.this_partition,
                })
                .collect(),
        }
    }

    /// Write the RIP at the current position (the end of the file).
    pub fn write<S: Write + Seek>(&self, stream: &mut MxfStream<S>) -> Result<()> {
        let value_len = RIP_ENTRY_LEN * self.entries.len() as u64 + 4;
        let llen = ber_llen(value_len, stream.min_llen());
        let overall = KEY_SIZE as u64 + u64::from(llen) + value_len;
        stream.write_kl(&keys::RANDOM_INDEX_PACK, value_len)?;
        for entry in &self.entries {
            stream.write_u32(entry.body_sid)?;
            stream.write_u64(entry.this_partition)?;
        }
        stream.write_u32(overall as u32)
    }

    /// Read the RIP from the file tail. The stream position is restored
    /// when no RIP is found.
    pub fn read<S: Read + Seek>(stream: &mut MxfStream<S>) -> Result<Self> {
        let original = stream.position()?;
        match Self::read_inner(stream) {
            Ok(rip) => Ok(rip),
            Err(err) => {
                stream.seek_to(original)?;
                Err(err)
            }
        }
    }

    fn read_inner<S: Read + Seek>(stream: &mut MxfStream<S>) -> Result<Self> {
        let file_len = stream.len()?;
        if file_len < 4 {
            return Err(Error::RipNotFound);
        }
        stream.seek_to(file_len - 4)?;
        let overall = u64::from(stream.read_u32()?);
        if overall < KEY_SIZE as u64 + 1 + 4 || overall > file_len {
            return Err(Error::RipNotFound);
        }
        stream.seek_to(file_len - overall)?;
        let (key, llen, len) = stream.read_kl()?;
        if !key.matches_ignoring_version(&keys::RANDOM_INDEX_PACK)
            || KEY_SIZE as u64 + u64::from(llen) + len != overall
            || len < 4
            || (len - 4) % RIP_ENTRY_LEN != 0
        {
            return Err(Error::RipNotFound);
        }
        let count = (len - 4) / RIP_ENTRY_LEN;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let body_sid = stream.read_u32()?;
            let this_partition = stream.read_u64()?;
            entries.push(RipEntry {
                body_sid,
                this_partition,
            });
        }
        Ok(RandomIndexPack { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PartitionKind, PartitionStatus};
    use std::io::Cursor;

    #[test]
    fn rip_round_trip() {
        let mut header = Partition::new(PartitionKind::Header, PartitionStatus::ClosedComplete);
        header.body_sid = 1;
        let mut footer = Partition::new(PartitionKind::Footer, PartitionStatus::ClosedComplete);
        footer.this_partition = 0x9000;

        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        stream.write_zeros(64).unwrap();
        let rip = RandomIndexPack::from_partitions(&[header, footer]);
        rip.write(&mut stream).unwrap();

        let read = RandomIndexPack::read(&mut stream).unwrap();
        assert_eq!(read.entries.len(), 2);
        assert_eq!(read.entries[0], RipEntry { body_sid: 1, this_partition: 0 });
        assert_eq!(read.entries[1], RipEntry { body_sid: 0, this_partition: 0x9000 });
    }

    #[test]
    fn missing_rip_restores_position() {
        let mut stream = MxfStream::new(Cursor::new(vec![0u8; 128]));
        stream.seek_to(32).unwrap();
        assert!(matches!(
            RandomIndexPack::read(&mut stream),
            Err(Error::RipNotFound)
        ));
        assert_eq!(stream.position().unwrap(), 32);
    }
}
