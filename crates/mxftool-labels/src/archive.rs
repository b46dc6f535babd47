//! BBC D3 archive preservation extension keys.

use mxftool_core::Ul;

const fn d3_item_key(ord: u8) -> Ul {
    Ul([
        0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x0c, 0x0d, 0x04, 0x01, ord, 0x00, 0x00, 0x00,
        0x00,
    ])
}

/// Preface: number of D3 playback errors encountered during transfer.
pub const D3_ERROR_COUNT: Ul = d3_item_key(0x01);

/// Preface: number of photosensitive-epilepsy analysis failures.
pub const PSE_FAILURE_COUNT: Ul = d3_item_key(0x02);
