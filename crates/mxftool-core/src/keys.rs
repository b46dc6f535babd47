//! Structural keys every MXF file carries regardless of its content.
//!
//! The content-dependent registries (set keys, item keys, essence container
//! labels, operational patterns) live in `mxftool-labels`.

use crate::Ul;

/// First 13 octets shared by all partition pack keys. Octet 13 carries the
/// open/closed status, octet 14 the header/body/footer kind.
pub const PARTITION_PACK_PREFIX: [u8; 13] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01,
];

/// KLV filler key.
pub const FILLER: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x02, 0x03, 0x01, 0x02, 0x10, 0x01, 0x00, 0x00, 0x00,
]);

/// Primer pack key; the first KLV of every header metadata block.
pub const PRIMER_PACK: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x05, 0x01, 0x00,
]);

/// Index table segment key.
pub const INDEX_TABLE_SEGMENT: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x10, 0x01, 0x00,
]);

/// Random Index Pack key, at the file tail.
pub const RANDOM_INDEX_PACK: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x11, 0x01, 0x00,
]);

/// True if `key` is the filler key (any registry version).
#[inline]
pub fn is_filler(key: &Ul) -> bool {
    key.matches_ignoring_version(&FILLER)
}

/// True if `key` opens a header metadata block (primer pack).
#[inline]
pub fn is_header_metadata(key: &Ul) -> bool {
    key.matches_ignoring_version(&PRIMER_PACK)
}

/// True if `key` is an index table segment.
#[inline]
pub fn is_index_table_segment(key: &Ul) -> bool {
    key.matches_ignoring_version(&INDEX_TABLE_SEGMENT)
}
