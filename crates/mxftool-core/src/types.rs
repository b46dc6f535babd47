//! Primitive MXF value types.
//!
//! Everything multi-byte is big-endian on the wire. The one exception is
//! the "indirect value" encoding used by tagged values, which carries its
//! own endianness marker and a half-swapped type label (see
//! [`Ul::half_swapped`]).

use crate::{Error, Result, KEY_SIZE};

/// A 16-byte SMPTE universal label.
///
/// Labels identify set definitions, item definitions, essence container
/// types, operational patterns, data definitions and coding schemes.
/// Octet 7 is the registry version and is ignored by some comparisons.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct Ul(pub [u8; 16]);

impl Ul {
    /// Parse a label from the start of a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < KEY_SIZE {
            return Err(Error::UnexpectedEof {
                need: KEY_SIZE,
                have: bytes.len(),
            });
        }
        let mut ul = [0u8; 16];
        ul.copy_from_slice(&bytes[..KEY_SIZE]);
        Ok(Ul(ul))
    }

    /// Raw label bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Equality that ignores the registry version octet (byte 7).
    pub fn matches_ignoring_version(&self, other: &Ul) -> bool {
        self.0[..7] == other.0[..7] && self.0[8..] == other.0[8..]
    }

    /// True if the first `n` octets match `prefix`.
    pub fn has_prefix(&self, prefix: &[u8]) -> bool {
        prefix.len() <= 16 && self.0[..prefix.len()] == *prefix
    }

    /// Half-swapped form used by the AAF indirect value encoding: the low
    /// eight octets precede the high eight.
    pub fn half_swapped(&self) -> Ul {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.0[8..]);
        out[8..].copy_from_slice(&self.0[..8]);
        Ul(out)
    }
}

impl std::fmt::Debug for Ul {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ul({self})")
    }
}

impl std::fmt::Display for Ul {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 && i % 4 == 0 {
                write!(f, ".")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// A 32-byte unique material identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Umid(pub [u8; 32]);

/// SMPTE 330M basic UMID prefix for material generated by this toolkit.
const UMID_PREFIX: [u8; 16] = [
    0x06, 0x0a, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x05, 0x01, 0x01, 0x0d, 0x20, 0x13, 0x00, 0x00, 0x00,
];

impl Umid {
    /// The all-zero UMID, used where no source package is referenced.
    pub const fn null() -> Self {
        Umid([0u8; 32])
    }

    /// Generate a fresh UMID: the SMPTE prefix plus 16 random bytes.
    pub fn generate() -> Self {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&UMID_PREFIX);
        out[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        Umid(out)
    }

    /// Parse a UMID from the start of a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 32 {
            return Err(Error::UnexpectedEof {
                need: 32,
                have: bytes.len(),
            });
        }
        let mut umid = [0u8; 32];
        umid.copy_from_slice(&bytes[..32]);
        Ok(Umid(umid))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl std::fmt::Debug for Umid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Umid(")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

/// An edit rate or aspect ratio as a signed rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Rational { num, den }
    }
}

/// 25 Hz PAL frame rate.
pub const RATE_25: Rational = Rational::new(25, 1);
/// 30000/1001 Hz NTSC frame rate.
pub const RATE_30_DROP: Rational = Rational::new(30000, 1001);
/// 48 kHz audio sample rate.
pub const RATE_48K: Rational = Rational::new(48000, 1);

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Wire timestamp: year down to quarter-milliseconds, 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[must_use]
pub struct Timestamp {
    pub year: i16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    /// Quarter-milliseconds (0..250).
    pub qmsec: u8,
}

impl Timestamp {
    /// Current UTC time.
    pub fn now() -> Self {
        use chrono::{Datelike, Timelike, Utc};
        let now = Utc::now();
        Timestamp {
            year: now.year() as i16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            min: now.minute() as u8,
            sec: now.second() as u8,
            qmsec: (now.timestamp_subsec_millis() / 4) as u8,
        }
    }
}

/// Product version carried by Identification sets, 10 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[must_use]
pub struct ProductVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub build: u16,
    pub release: u16,
}

/// Wire type of a header-metadata item.
///
/// Array and batch variants share one encoding, an `(count, element_length)`
/// header followed by the elements; arrays are ordered, batches are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Boolean,
    /// `(major << 8) | minor` version word.
    VersionType,
    ProductVersion,
    Rational,
    Timestamp,
    Ul,
    Uuid,
    Umid,
    /// UTF-16BE string with a terminating null.
    Utf16,
    /// Fixed- or variable-size byte block with no further structure.
    Bytes,
    /// Endianness-prefixed indirect value (tagged values).
    Indirect,
    StrongRef,
    WeakRef,
    StrongRefArray,
    StrongRefBatch,
    WeakRefArray,
    WeakRefBatch,
    UlBatch,
    Int32Array,
    UInt32Array,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ul_version_octet_ignored() {
        let a = Ul([0x06, 0x0e, 0x2b, 0x34, 1, 1, 1, 2, 3, 1, 2, 0x10, 1, 0, 0, 0]);
        let b = Ul([0x06, 0x0e, 0x2b, 0x34, 1, 1, 1, 9, 3, 1, 2, 0x10, 1, 0, 0, 0]);
        assert_ne!(a, b);
        assert!(a.matches_ignoring_version(&b));
    }

    #[test]
    fn ul_half_swap_is_involution() {
        let ul = Ul([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
        assert_eq!(ul.half_swapped().0[0], 9);
        assert_eq!(ul.half_swapped().half_swapped(), ul);
    }

    #[test]
    fn generated_umids_are_unique() {
        let a = Umid::generate();
        let b = Umid::generate();
        assert!(a.0.starts_with(&UMID_PREFIX));
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert!(Umid::null().is_null());
    }

    #[test]
    fn timestamp_now_is_plausible() {
        let ts = Timestamp::now();
        assert!(ts.year >= 2024);
        assert!((1..=12).contains(&ts.month));
        assert!(ts.qmsec < 250);
    }
}
