//! KLV stream over a random-access byte stream.
//!
//! A KLV record is `(key: 16 bytes, length: BER 1-9 bytes, value)`. BER
//! lengths up to 127 use the one-byte short form; longer values use
//! `0x80 | width` followed by `width` big-endian bytes. Writers may impose
//! a minimum length-field width (`min_llen`) so that records can be
//! re-written in place with a stable size.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::{keys, Error, Key, Rational, Result, Timestamp, Ul, Umid, KEY_SIZE};

/// Wrapper that carries the minimum length-field width and the run-in
/// length alongside the underlying stream.
#[must_use]
pub struct MxfStream<S> {
    inner: S,
    min_llen: u8,
    runin: u64,
}

impl<S> MxfStream<S> {
    /// Wrap a stream with the default minimum length width of 1.
    pub fn new(inner: S) -> Self {
        MxfStream {
            inner,
            min_llen: 1,
            runin: 0,
        }
    }

    /// Set the minimum BER length width for subsequent writes (1-9).
    pub fn set_min_llen(&mut self, llen: u8) -> Result<()> {
        if !(1..=9).contains(&llen) {
            return Err(Error::InvalidLlen(llen));
        }
        self.min_llen = llen;
        Ok(())
    }

    #[inline]
    pub fn min_llen(&self) -> u8 {
        self.min_llen
    }

    /// Length of the run-in preceding the header partition pack.
    #[inline]
    pub fn runin(&self) -> u64 {
        self.runin
    }

    pub fn set_runin(&mut self, runin: u64) {
        self.runin = runin;
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read> Read for MxfStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Write> Write for MxfStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Seek> Seek for MxfStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Minimal number of bytes needed to represent `len` big-endian.
fn ber_content_width(len: u64) -> u8 {
    let mut width = 1u8;
    let mut v = len >> 8;
    while v != 0 {
        width += 1;
        v >>= 8;
    }
    width
}

/// Total length-field width `write_l` will use for `len`.
pub(crate) fn ber_llen(len: u64, min_llen: u8) -> u8 {
    if len <= 127 && min_llen <= 1 {
        1
    } else {
        (1 + ber_content_width(len)).max(min_llen)
    }
}

impl<S: Seek> MxfStream<S> {
    /// Absolute stream position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek to an absolute stream position.
    pub fn seek_to(&mut self, position: u64) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::Start(position))?)
    }

    /// Skip `len` bytes forward.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(len as i64))?;
        Ok(())
    }

    /// Total stream length; the current position is preserved.
    pub fn len(&mut self) -> Result<u64> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }
}

impl<S: Read> MxfStream<S> {
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(ReadBytesExt::read_u8(&mut self.inner)?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.inner.read_u16::<BigEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32::<BigEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.inner.read_u64::<BigEndian>()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(ReadBytesExt::read_i8(&mut self.inner)?)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.inner.read_i64::<BigEndian>()?)
    }

    /// Read exactly `len` bytes into a fresh buffer.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read the K of a KLV record.
    pub fn read_k(&mut self) -> Result<Key> {
        let mut key = [0u8; KEY_SIZE];
        self.inner.read_exact(&mut key)?;
        Ok(Ul(key))
    }

    /// Read a BER length; returns `(llen, len)`.
    pub fn read_l(&mut self) -> Result<(u8, u64)> {
        let first = ReadBytesExt::read_u8(&mut self.inner)?;
        if first < 0x80 {
            return Ok((1, u64::from(first)));
        }
        let width = first & 0x7f;
        if width == 0 || width > 8 {
            return Err(Error::BerWidthTooLarge(width));
        }
        let mut len = 0u64;
        for _ in 0..width {
            len = (len << 8) | u64::from(ReadBytesExt::read_u8(&mut self.inner)?);
        }
        Ok((1 + width, len))
    }

    /// Read a complete KL; returns `(key, llen, len)`.
    pub fn read_kl(&mut self) -> Result<(Key, u8, u64)> {
        let key = self.read_k()?;
        let (llen, len) = self.read_l()?;
        Ok((key, llen, len))
    }

    /// Read an 8-byte `(count, element_length)` batch or array header.
    pub fn read_batch_header(&mut self) -> Result<(u32, u32)> {
        let count = self.read_u32()?;
        let element_length = self.read_u32()?;
        Ok((count, element_length))
    }
}

impl<S: Read + Seek> MxfStream<S> {
    /// Read the next KL whose key is not the filler key, skipping fillers.
    pub fn read_next_nonfiller_kl(&mut self) -> Result<(Key, u8, u64)> {
        loop {
            let (key, llen, len) = self.read_kl()?;
            if keys::is_filler(&key) {
                self.skip(len)?;
            } else {
                return Ok((key, llen, len));
            }
        }
    }
}

impl<S: Write> MxfStream<S> {
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(WriteBytesExt::write_u8(&mut self.inner, value)?)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.inner.write_u16::<BigEndian>(value)?)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.inner.write_u32::<BigEndian>(value)?)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        Ok(self.inner.write_u64::<BigEndian>(value)?)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        Ok(WriteBytesExt::write_i8(&mut self.inner, value)?)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        Ok(self.inner.write_i16::<BigEndian>(value)?)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        Ok(self.inner.write_i64::<BigEndian>(value)?)
    }

    pub fn write_all_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn write_key(&mut self, key: &Key) -> Result<()> {
        self.inner.write_all(key.as_bytes())?;
        Ok(())
    }

    pub fn write_umid(&mut self, umid: &Umid) -> Result<()> {
        self.inner.write_all(umid.as_bytes())?;
        Ok(())
    }

    pub fn write_rational(&mut self, value: Rational) -> Result<()> {
        self.inner.write_i32::<BigEndian>(value.num)?;
        self.inner.write_i32::<BigEndian>(value.den)?;
        Ok(())
    }

    pub fn write_timestamp(&mut self, value: Timestamp) -> Result<()> {
        self.inner.write_i16::<BigEndian>(value.year)?;
        self.inner.write_all(&[
            value.month, value.day, value.hour, value.min, value.sec, value.qmsec,
        ])?;
        Ok(())
    }

    pub fn write_zeros(&mut self, len: u64) -> Result<()> {
        const ZEROS: [u8; 256] = [0u8; 256];
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(ZEROS.len() as u64) as usize;
            self.inner.write_all(&ZEROS[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    /// Write an 8-byte `(count, element_length)` batch header.
    pub fn write_batch_header(&mut self, count: u32, element_length: u32) -> Result<()> {
        self.write_u32(count)?;
        self.write_u32(element_length)
    }

    /// Array headers share the batch header encoding.
    #[inline]
    pub fn write_array_header(&mut self, count: u32, element_length: u32) -> Result<()> {
        self.write_batch_header(count, element_length)
    }

    /// Write a BER length padded to exactly `llen` bytes.
    pub fn write_fixed_l(&mut self, llen: u8, len: u64) -> Result<()> {
        if !(1..=9).contains(&llen) {
            return Err(Error::InvalidLlen(llen));
        }
        if llen == 1 {
            if len > 127 {
                return Err(Error::FixedLengthOverflow { llen, len });
            }
            return self.write_u8(len as u8);
        }
        let width = llen - 1;
        if ber_content_width(len) > width {
            return Err(Error::FixedLengthOverflow { llen, len });
        }
        self.write_u8(0x80 | width)?;
        for shift in (0..width).rev() {
            self.write_u8((len >> (shift * 8)) as u8)?;
        }
        Ok(())
    }

    /// Write a BER length of at least `min_llen` bytes; returns the width
    /// actually used.
    pub fn write_l(&mut self, len: u64) -> Result<u8> {
        let llen = ber_llen(len, self.min_llen);
        self.write_fixed_l(llen, len)?;
        Ok(llen)
    }

    /// Write a key and a minimum-width BER length; returns the length width.
    pub fn write_kl(&mut self, key: &Key, len: u64) -> Result<u8> {
        self.write_key(key)?;
        self.write_l(len)
    }

    /// Write a key and a length field padded to exactly `llen` bytes.
    pub fn write_fixed_kl(&mut self, key: &Key, llen: u8, len: u64) -> Result<()> {
        self.write_key(key)?;
        self.write_fixed_l(llen, len)
    }

    /// Write one filler KLV occupying exactly `total_size` bytes.
    pub fn write_fill(&mut self, total_size: u64) -> Result<()> {
        let min = (KEY_SIZE as u64) + u64::from(self.min_llen);
        if total_size < min {
            return Err(Error::FillTooSmall {
                size: total_size,
                min,
            });
        }
        // The length width may have to grow beyond min_llen for very large
        // fillers; pick the smallest that keeps the total exact.
        let mut llen = self.min_llen;
        while llen <= 9 && u64::from(llen) <= total_size - KEY_SIZE as u64 {
            let value_len = total_size - KEY_SIZE as u64 - u64::from(llen);
            if ber_llen(value_len, llen) == llen {
                self.write_fixed_kl(&keys::FILLER, llen, value_len)?;
                return self.write_zeros(value_len);
            }
            llen += 1;
        }
        Err(Error::FillTooSmall {
            size: total_size,
            min,
        })
    }
}

impl<S: Write + Seek> MxfStream<S> {
    /// Pad with a filler KLV so the next byte lands at absolute position
    /// `target`. A gap smaller than the minimum filler size is an error;
    /// callers reserving a re-writable region rely on that.
    pub fn fill_to_position(&mut self, target: u64) -> Result<()> {
        let position = self.position()?;
        if position == target {
            return Ok(());
        }
        if position > target {
            return Err(Error::FillOverrun { position, target });
        }
        self.write_fill(target - position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(min_llen: u8) -> MxfStream<Cursor<Vec<u8>>> {
        let mut s = MxfStream::new(Cursor::new(Vec::new()));
        s.set_min_llen(min_llen).unwrap();
        s
    }

    #[test]
    fn ber_short_form() {
        let mut s = stream(1);
        s.write_l(100).unwrap();
        s.seek_to(0).unwrap();
        assert_eq!(s.read_l().unwrap(), (1, 100));
    }

    #[test]
    fn ber_long_form() {
        let mut s = stream(1);
        let llen = s.write_l(0x0102_0304).unwrap();
        assert_eq!(llen, 5);
        s.seek_to(0).unwrap();
        assert_eq!(s.read_l().unwrap(), (5, 0x0102_0304));
    }

    #[test]
    fn min_llen_forces_long_form() {
        let mut s = stream(4);
        assert_eq!(s.write_l(5).unwrap(), 4);
        s.seek_to(0).unwrap();
        assert_eq!(s.read_l().unwrap(), (4, 5));
        // first byte is 0x80 | 3
        assert_eq!(s.get_ref().get_ref()[0], 0x83);
    }

    #[test]
    fn fixed_llen_rejects_overflow() {
        let mut s = stream(1);
        assert!(s.write_fixed_l(1, 128).is_err());
        assert!(s.write_fixed_l(2, 256).is_err());
        s.write_fixed_l(2, 255).unwrap();
        s.seek_to(0).unwrap();
        assert_eq!(s.read_l().unwrap(), (2, 255));
    }

    #[test]
    fn kl_round_trip() {
        let key = Ul([7u8; 16]);
        let mut s = stream(4);
        s.write_kl(&key, 42).unwrap();
        s.seek_to(0).unwrap();
        let (k, llen, len) = s.read_kl().unwrap();
        assert_eq!(k, key);
        assert_eq!((llen, len), (4, 42));
    }

    #[test]
    fn nonfiller_skips_fillers() {
        let key = Ul([9u8; 16]);
        let mut s = stream(1);
        s.write_fill(32).unwrap();
        s.write_fill(17).unwrap();
        s.write_kl(&key, 0).unwrap();
        s.seek_to(0).unwrap();
        let (k, _, _) = s.read_next_nonfiller_kl().unwrap();
        assert_eq!(k, key);
    }

    #[test]
    fn fill_to_position_is_exact() {
        let mut s = stream(4);
        s.write_zeros(10).unwrap();
        s.fill_to_position(64).unwrap();
        assert_eq!(s.position().unwrap(), 64);
        // gap smaller than key + llen is rejected
        s.write_zeros(10).unwrap();
        assert!(matches!(
            s.fill_to_position(80),
            Err(Error::FillTooSmall { .. })
        ));
        // filling backwards is rejected
        assert!(matches!(
            s.fill_to_position(10),
            Err(Error::FillOverrun { .. })
        ));
    }

    #[test]
    fn fill_is_a_valid_klv() {
        let mut s = stream(4);
        s.write_fill(1024).unwrap();
        s.seek_to(0).unwrap();
        let (key, llen, len) = s.read_kl().unwrap();
        assert!(keys::is_filler(&key));
        assert_eq!(16 + u64::from(llen) + len, 1024);
    }
}
