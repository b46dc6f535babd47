//! The primer pack: per-file local tag table.
//!
//! Registered items reuse their static tag; items without one (extension
//! definitions and items carried over from opaque sets) get a dynamic tag
//! allocated from 0x8000 in first-use order.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use mxftool_core::{keys, MxfStream, Ul};

use crate::{Error, Result};

const PRIMER_ENTRY_LEN: u32 = 18;

/// Maps 2-byte local tags to 16-byte item keys for one file.
#[derive(Debug, Default)]
#[must_use]
pub struct PrimerPack {
    entries: Vec<(u16, Ul)>,
    by_tag: HashMap<u16, Ul>,
    by_key: HashMap<Ul, u16>,
    next_dynamic: u16,
}

impl PrimerPack {
    pub fn new() -> Self {
        PrimerPack {
            entries: Vec::new(),
            by_tag: HashMap::new(),
            by_key: HashMap::new(),
            next_dynamic: 0x8000,
        }
    }

    pub fn key_for_tag(&self, tag: u16) -> Option<&Ul> {
        self.by_tag.get(&tag)
    }

    pub fn tag_for_key(&self, key: &Ul) -> Option<u16> {
        self.by_key.get(key).copied()
    }

    pub fn entries(&self) -> &[(u16, Ul)] {
        &self.entries
    }

    fn insert(&mut self, tag: u16, key: Ul) {
        self.entries.push((tag, key));
        self.by_tag.insert(tag, key);
        self.by_key.insert(key, tag);
    }

    /// Reserve an exact mapping (used for tags inside opaque sets).
    pub fn reserve(&mut self, tag: u16, key: &Ul) -> Result<()> {
        match self.by_tag.get(&tag) {
            Some(existing) if existing == key => Ok(()),
            Some(existing) => Err(Error::TagCollision {
                tag,
                existing: *existing,
            }),
            None => {
                self.insert(tag, *key);
                Ok(())
            }
        }
    }

    /// Map `key`, using `static_tag` when non-zero, else the next free
    /// dynamic tag. Idempotent per key.
    pub fn assign(&mut self, key: &Ul, static_tag: u16) -> Result<u16> {
        if let Some(tag) = self.by_key.get(key) {
            return Ok(*tag);
        }
        if static_tag != 0 {
            if let Some(existing) = self.by_tag.get(&static_tag) {
                return Err(Error::TagCollision {
                    tag: static_tag,
                    existing: *existing,
                });
            }
            self.insert(static_tag, *key);
            return Ok(static_tag);
        }
        let mut tag = self.next_dynamic;
        while self.by_tag.contains_key(&tag) {
            tag = tag.wrapping_add(1);
        }
        self.next_dynamic = tag.wrapping_add(1);
        self.insert(tag, *key);
        Ok(tag)
    }

    /// Encoded KLV value size.
    pub fn value_len(&self) -> u64 {
        8 + u64::from(PRIMER_ENTRY_LEN) * self.entries.len() as u64
    }

    pub fn write<S: Write + Seek>(&self, stream: &mut MxfStream<S>) -> Result<()> {
        stream.write_kl(&keys::PRIMER_PACK, self.value_len())?;
        stream.write_batch_header(self.entries.len() as u32, PRIMER_ENTRY_LEN)?;
        for (tag, key) in &self.entries {
            stream.write_u16(*tag)?;
            stream.write_key(key)?;
        }
        Ok(())
    }

    /// Parse a primer pack whose KL has already been read.
    pub fn read<S: Read + Seek>(stream: &mut MxfStream<S>, len: u64) -> Result<Self> {
        let (count, element_length) = stream.read_batch_header()?;
        if element_length != PRIMER_ENTRY_LEN || u64::from(count) * 18 + 8 > len {
            return Err(Error::NotHeaderMetadata(keys::PRIMER_PACK));
        }
        let mut primer = PrimerPack::new();
        for _ in 0..count {
            let tag = stream.read_u16()?;
            let key = stream.read_k()?;
            primer.insert(tag, key);
            if tag >= 0x8000 && tag >= primer.next_dynamic {
                primer.next_dynamic = tag.wrapping_add(1);
            }
        }
        // skip any trailing bytes beyond the declared entries
        let consumed = 8 + u64::from(count) * u64::from(PRIMER_ENTRY_LEN);
        if len > consumed {
            stream.skip(len - consumed)?;
        }
        Ok(primer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn static_and_dynamic_assignment() {
        let mut primer = PrimerPack::new();
        let a = Ul([1; 16]);
        let b = Ul([2; 16]);
        let c = Ul([3; 16]);
        assert_eq!(primer.assign(&a, 0x3c0a).unwrap(), 0x3c0a);
        assert_eq!(primer.assign(&b, 0).unwrap(), 0x8000);
        assert_eq!(primer.assign(&c, 0).unwrap(), 0x8001);
        // assignment is idempotent
        assert_eq!(primer.assign(&b, 0).unwrap(), 0x8000);
        // a different key cannot steal a taken tag
        assert!(matches!(
            primer.assign(&Ul([4; 16]), 0x3c0a),
            Err(Error::TagCollision { .. })
        ));
    }

    #[test]
    fn reserved_tags_are_skipped_by_the_allocator() {
        let mut primer = PrimerPack::new();
        primer.reserve(0x8000, &Ul([9; 16])).unwrap();
        assert_eq!(primer.assign(&Ul([1; 16]), 0).unwrap(), 0x8001);
    }

    #[test]
    fn round_trip() {
        let mut primer = PrimerPack::new();
        primer.assign(&Ul([1; 16]), 0x3c0a).unwrap();
        primer.assign(&Ul([2; 16]), 0).unwrap();

        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        primer.write(&mut stream).unwrap();
        stream.seek_to(0).unwrap();
        let (key, _, len) = stream.read_kl().unwrap();
        assert!(keys::is_header_metadata(&key));
        let read = PrimerPack::read(&mut stream, len).unwrap();
        assert_eq!(read.entries(), primer.entries());
        // the allocator continues past the tags read from the file
        let mut read = read;
        assert_eq!(read.assign(&Ul([3; 16]), 0).unwrap(), 0x8001);
    }
}
