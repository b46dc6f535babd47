//! Typed item values and their wire codecs.

use byteorder::{BigEndian, ByteOrder};
use mxftool_core::{Error as CoreError, ItemType, ProductVersion, Rational, Timestamp, Ul, Umid};
use uuid::Uuid;

use crate::{Error, Result};

/// One decoded item value.
///
/// Strong and weak references both carry the target's instance UID; the
/// item definition's type distinguishes ownership from lookup. Values of
/// items unknown to the data model are preserved as [`MetaValue::Opaque`]
/// so a re-write round-trips.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Boolean(bool),
    Version(u16),
    ProductVersion(ProductVersion),
    Rational(Rational),
    Timestamp(Timestamp),
    Ul(Ul),
    Uuid(Uuid),
    Umid(Umid),
    String(String),
    Bytes(Vec<u8>),
    Ref(Uuid),
    RefVec(Vec<Uuid>),
    UlBatch(Vec<Ul>),
    Int32Array(Vec<i32>),
    UInt32Array(Vec<u32>),
    Opaque(Vec<u8>),
}

fn short(key: &Ul, need: usize, bytes: &[u8]) -> Result<()> {
    if bytes.len() < need {
        return Err(Error::MalformedSet(*key));
    }
    Ok(())
}

fn batch<T>(
    key: &Ul,
    bytes: &[u8],
    element_len: usize,
    mut parse: impl FnMut(&[u8]) -> T,
) -> Result<Vec<T>> {
    short(key, 8, bytes)?;
    let count = BigEndian::read_u32(&bytes[0..4]) as usize;
    let declared = BigEndian::read_u32(&bytes[4..8]) as usize;
    if declared < element_len || bytes.len() < 8 + count * declared {
        return Err(Error::MalformedSet(*key));
    }
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let start = 8 + i * declared;
        out.push(parse(&bytes[start..start + element_len]));
    }
    Ok(out)
}

impl MetaValue {
    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            MetaValue::UInt8(_) => "uint8",
            MetaValue::UInt16(_) => "uint16",
            MetaValue::UInt32(_) => "uint32",
            MetaValue::UInt64(_) => "uint64",
            MetaValue::Int8(_) => "int8",
            MetaValue::Int16(_) => "int16",
            MetaValue::Int32(_) => "int32",
            MetaValue::Int64(_) => "int64",
            MetaValue::Boolean(_) => "boolean",
            MetaValue::Version(_) => "version",
            MetaValue::ProductVersion(_) => "product-version",
            MetaValue::Rational(_) => "rational",
            MetaValue::Timestamp(_) => "timestamp",
            MetaValue::Ul(_) => "label",
            MetaValue::Uuid(_) => "uuid",
            MetaValue::Umid(_) => "umid",
            MetaValue::String(_) => "string",
            MetaValue::Bytes(_) => "bytes",
            MetaValue::Ref(_) => "reference",
            MetaValue::RefVec(_) => "reference-array",
            MetaValue::UlBatch(_) => "label-batch",
            MetaValue::Int32Array(_) => "int32-array",
            MetaValue::UInt32Array(_) => "uint32-array",
            MetaValue::Opaque(_) => "opaque",
        }
    }

    /// Decode an item value of the given wire type.
    pub fn decode(key: &Ul, item_type: ItemType, bytes: &[u8]) -> Result<MetaValue> {
        Ok(match item_type {
            ItemType::UInt8 => {
                short(key, 1, bytes)?;
                MetaValue::UInt8(bytes[0])
            }
            ItemType::UInt16 => {
                short(key, 2, bytes)?;
                MetaValue::UInt16(BigEndian::read_u16(bytes))
            }
            ItemType::UInt32 => {
                short(key, 4, bytes)?;
                MetaValue::UInt32(BigEndian::read_u32(bytes))
            }
            ItemType::UInt64 => {
                short(key, 8, bytes)?;
                MetaValue::UInt64(BigEndian::read_u64(bytes))
            }
            ItemType::Int8 => {
                short(key, 1, bytes)?;
                MetaValue::Int8(bytes[0] as i8)
            }
            ItemType::Int16 => {
                short(key, 2, bytes)?;
                MetaValue::Int16(BigEndian::read_i16(bytes))
            }
            ItemType::Int32 => {
                short(key, 4, bytes)?;
                MetaValue::Int32(BigEndian::read_i32(bytes))
            }
            ItemType::Int64 => {
                short(key, 8, bytes)?;
                MetaValue::Int64(BigEndian::read_i64(bytes))
            }
            ItemType::Boolean => {
                short(key, 1, bytes)?;
                MetaValue::Boolean(bytes[0] != 0)
            }
            ItemType::VersionType => {
                short(key, 2, bytes)?;
                MetaValue::Version(BigEndian::read_u16(bytes))
            }
            ItemType::ProductVersion => {
                short(key, 10, bytes)?;
                MetaValue::ProductVersion(ProductVersion {
                    major: BigEndian::read_u16(&bytes[0..2]),
                    minor: BigEndian::read_u16(&bytes[2..4]),
                    patch: BigEndian::read_u16(&bytes[4..6]),
                    build: BigEndian::read_u16(&bytes[6..8]),
                    release: BigEndian::read_u16(&bytes[8..10]),
                })
            }
            ItemType::Rational => {
                short(key, 8, bytes)?;
                MetaValue::Rational(Rational::new(
                    BigEndian::read_i32(&bytes[0..4]),
                    BigEndian::read_i32(&bytes[4..8]),
                ))
            }
            ItemType::Timestamp => {
                short(key, 8, bytes)?;
                MetaValue::Timestamp(Timestamp {
                    year: BigEndian::read_i16(&bytes[0..2]),
                    month: bytes[2],
                    day: bytes[3],
                    hour: bytes[4],
                    min: bytes[5],
                    sec: bytes[6],
                    qmsec: bytes[7],
                })
            }
            ItemType::Ul => MetaValue::Ul(Ul::from_bytes(bytes).map_err(map_eof(key))?),
            ItemType::Uuid => {
                short(key, 16, bytes)?;
                let mut uid = [0u8; 16];
                uid.copy_from_slice(&bytes[..16]);
                MetaValue::Uuid(Uuid::from_bytes(uid))
            }
            ItemType::Umid => MetaValue::Umid(Umid::from_bytes(bytes).map_err(map_eof(key))?),
            ItemType::Utf16 => MetaValue::String(decode_utf16be(bytes)),
            ItemType::Bytes | ItemType::Indirect => MetaValue::Bytes(bytes.to_vec()),
            ItemType::StrongRef | ItemType::WeakRef => {
                short(key, 16, bytes)?;
                let mut uid = [0u8; 16];
                uid.copy_from_slice(&bytes[..16]);
                MetaValue::Ref(Uuid::from_bytes(uid))
            }
            ItemType::StrongRefArray
            | ItemType::StrongRefBatch
            | ItemType::WeakRefArray
            | ItemType::WeakRefBatch => MetaValue::RefVec(batch(key, bytes, 16, |b| {
                let mut uid = [0u8; 16];
                uid.copy_from_slice(b);
                Uuid::from_bytes(uid)
            })?),
            ItemType::UlBatch => MetaValue::UlBatch(batch(key, bytes, 16, |b| {
                let mut ul = [0u8; 16];
                ul.copy_from_slice(b);
                Ul(ul)
            })?),
            ItemType::Int32Array => {
                MetaValue::Int32Array(batch(key, bytes, 4, BigEndian::read_i32)?)
            }
            ItemType::UInt32Array => {
                MetaValue::UInt32Array(batch(key, bytes, 4, BigEndian::read_u32)?)
            }
        })
    }

    /// Append the wire encoding of this value to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            MetaValue::UInt8(v) => out.push(*v),
            MetaValue::UInt16(v) | MetaValue::Version(v) => out.extend_from_slice(&v.to_be_bytes()),
            MetaValue::UInt32(v) => out.extend_from_slice(&v.to_be_bytes()),
            MetaValue::UInt64(v) => out.extend_from_slice(&v.to_be_bytes()),
            MetaValue::Int8(v) => out.push(*v as u8),
            MetaValue::Int16(v) => out.extend_from_slice(&v.to_be_bytes()),
            MetaValue::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
            MetaValue::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
            MetaValue::Boolean(v) => out.push(u8::from(*v)),
            MetaValue::ProductVersion(v) => {
                for part in [v.major, v.minor, v.patch, v.build, v.release] {
                    out.extend_from_slice(&part.to_be_bytes());
                }
            }
            MetaValue::Rational(v) => {
                out.extend_from_slice(&v.num.to_be_bytes());
                out.extend_from_slice(&v.den.to_be_bytes());
            }
            MetaValue::Timestamp(v) => {
                out.extend_from_slice(&v.year.to_be_bytes());
                out.extend_from_slice(&[v.month, v.day, v.hour, v.min, v.sec, v.qmsec]);
            }
            MetaValue::Ul(v) => out.extend_from_slice(v.as_bytes()),
            MetaValue::Uuid(v) => out.extend_from_slice(v.as_bytes()),
            MetaValue::Umid(v) => out.extend_from_slice(v.as_bytes()),
            MetaValue::String(v) => encode_utf16be(v, out),
            MetaValue::Bytes(v) | MetaValue::Opaque(v) => out.extend_from_slice(v),
            MetaValue::Ref(v) => out.extend_from_slice(v.as_bytes()),
            MetaValue::RefVec(refs) => {
                out.extend_from_slice(&(refs.len() as u32).to_be_bytes());
                out.extend_from_slice(&16u32.to_be_bytes());
                for r in refs {
                    out.extend_from_slice(r.as_bytes());
                }
            }
            MetaValue::UlBatch(uls) => {
                out.extend_from_slice(&(uls.len() as u32).to_be_bytes());
                out.extend_from_slice(&16u32.to_be_bytes());
                for ul in uls {
                    out.extend_from_slice(ul.as_bytes());
                }
            }
            MetaValue::Int32Array(values) => {
                out.extend_from_slice(&(values.len() as u32).to_be_bytes());
                out.extend_from_slice(&4u32.to_be_bytes());
                for v in values {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
            MetaValue::UInt32Array(values) => {
                out.extend_from_slice(&(values.len() as u32).to_be_bytes());
                out.extend_from_slice(&4u32.to_be_bytes());
                for v in values {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
    }
}

fn map_eof(key: &Ul) -> impl Fn(CoreError) -> Error + '_ {
    move |_| Error::MalformedSet(*key)
}

/// Decode a UTF-16BE string, stopping at the first null.
pub(crate) fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Encode a UTF-16BE string with a terminating null.
pub(crate) fn encode_utf16be(value: &str, out: &mut Vec<u8>) {
    for unit in value.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(item_type: ItemType, value: MetaValue) {
        let key = Ul([1; 16]);
        let mut bytes = Vec::new();
        value.encode(&mut bytes);
        assert_eq!(MetaValue::decode(&key, item_type, &bytes).unwrap(), value);
    }

    #[test]
    fn scalar_round_trips() {
        round_trip(ItemType::UInt8, MetaValue::UInt8(0xAB));
        round_trip(ItemType::UInt32, MetaValue::UInt32(0xDEAD_BEEF));
        round_trip(ItemType::Int64, MetaValue::Int64(-42));
        round_trip(ItemType::Boolean, MetaValue::Boolean(true));
        round_trip(ItemType::Rational, MetaValue::Rational(Rational::new(25, 1)));
        round_trip(
            ItemType::Timestamp,
            MetaValue::Timestamp(Timestamp {
                year: 2008,
                month: 6,
                day: 1,
                hour: 12,
                min: 30,
                sec: 59,
                qmsec: 120,
            }),
        );
    }

    #[test]
    fn string_round_trip_strips_null() {
        let key = Ul([1; 16]);
        let value = MetaValue::String("D3 material".to_owned());
        let mut bytes = Vec::new();
        value.encode(&mut bytes);
        // terminated with one null code unit
        assert_eq!(bytes.len(), "D3 material".len() * 2 + 2);
        assert_eq!(MetaValue::decode(&key, ItemType::Utf16, &bytes).unwrap(), value);
    }

    #[test]
    fn ref_vec_round_trip() {
        round_trip(
            ItemType::StrongRefArray,
            MetaValue::RefVec(vec![Uuid::new_v4(), Uuid::new_v4()]),
        );
        round_trip(ItemType::Int32Array, MetaValue::Int32Array(vec![23, 336]));
        round_trip(ItemType::UlBatch, MetaValue::UlBatch(vec![Ul([9; 16])]));
    }

    #[test]
    fn truncated_values_are_rejected() {
        let key = Ul([1; 16]);
        assert!(MetaValue::decode(&key, ItemType::UInt32, &[1, 2]).is_err());
        assert!(MetaValue::decode(&key, ItemType::StrongRef, &[0; 8]).is_err());
        assert!(MetaValue::decode(&key, ItemType::UlBatch, &[0; 4]).is_err());
    }
}
