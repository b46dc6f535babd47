//! Essence container labels, element keys and track numbers.
//!
//! An essence element key is the generic-container element prefix followed
//! by the four track-number bytes `(item type, element count, element type,
//! element number)`. The archive audio keys therefore carry the per-session
//! track count in octet 13, which is why they are built per file rather
//! than kept as process-wide constants.

use mxftool_core::{Key, Ul};

// ---- essence container labels -------------------------------------------

pub const MULTIPLE_WRAPPINGS: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x03, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x7f, 0x01, 0x00,
]);

pub const SD_UNC_625_50I_422_135_FRAME_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x05, 0x7f, 0x01,
]);

pub const SD_UNC_625_50I_422_135_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x05, 0x7f, 0x02,
]);

pub const BWF_FRAME_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x06, 0x01, 0x00,
]);

pub const BWF_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x06, 0x02, 0x00,
]);

pub const IECDV_25_625_50_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x02, 0x02, 0x02,
]);

pub const IECDV_25_525_60_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x02, 0x01, 0x02,
]);

pub const DVBASED_25_625_50_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x03, 0x02, 0x02,
]);

pub const DVBASED_25_525_60_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x03, 0x01, 0x02,
]);

pub const DVBASED_50_625_50_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x04, 0x02, 0x02,
]);

pub const DVBASED_50_525_60_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x04, 0x01, 0x02,
]);

pub const AVID_MJPEG_CLIP_WRAPPED: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x02, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x01, 0x02, 0x01,
]);

/// Container label Avid requires on MJPEG picture descriptors.
pub const AVID_AAF_KLV_ESSENCE_CONTAINER: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x02, 0x0d, 0x01, 0x03, 0x01, 0x02, 0xff, 0x01, 0x00,
]);

// ---- picture essence coding labels --------------------------------------

const fn avid_mjpeg_coding(variant: u8) -> Ul {
    Ul([
        0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x02, 0x04, 0x01, 0x02, 0x02, 0x01, 0x01, variant,
        0x00,
    ])
}

pub const AVID_MJPEG_21_PAL: Ul = avid_mjpeg_coding(0x01);
pub const AVID_MJPEG_31_PAL: Ul = avid_mjpeg_coding(0x02);
pub const AVID_MJPEG_101_PAL: Ul = avid_mjpeg_coding(0x03);
pub const AVID_MJPEG_101M_PAL: Ul = avid_mjpeg_coding(0x04);
pub const AVID_MJPEG_151S_PAL: Ul = avid_mjpeg_coding(0x05);
pub const AVID_MJPEG_201_PAL: Ul = avid_mjpeg_coding(0x06);

pub const IECDV_25_625_50_CODING: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x04, 0x01, 0x02, 0x02, 0x02, 0x01, 0x02, 0x00,
]);

pub const DVBASED_25_625_50_CODING: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x04, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x00,
]);

pub const DVBASED_50_625_50_CODING: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x04, 0x01, 0x02, 0x02, 0x02, 0x03, 0x02, 0x00,
]);

// ---- essence element keys -----------------------------------------------

/// System item element key (archive content packages).
pub const SYSTEM_ITEM_ELEMENT: Key = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x14, 0x02, 0x01, 0x00,
]);

/// Generic-container element key prefix; the last four octets are the
/// track number.
const ELEMENT_KEY_PREFIX: [u8; 12] = [
    0x06, 0x0e, 0x2b, 0x34, 0x01, 0x02, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01,
];

/// Item type octets.
pub const PICTURE_ITEM_TYPE: u8 = 0x15;
pub const SOUND_ITEM_TYPE: u8 = 0x16;
pub const DV_ITEM_TYPE: u8 = 0x18;

/// Element type octets.
pub const UNC_FRAME_WRAPPED_EE_TYPE: u8 = 0x02;
pub const UNC_CLIP_WRAPPED_EE_TYPE: u8 = 0x03;
pub const BWF_FRAME_WRAPPED_EE_TYPE: u8 = 0x01;
pub const BWF_CLIP_WRAPPED_EE_TYPE: u8 = 0x02;
pub const DV_CLIP_WRAPPED_EE_TYPE: u8 = 0x02;
pub const AVID_MJPEG_CLIP_WRAPPED_EE_TYPE: u8 = 0x01;

/// Build a `(item type, element count, element type, element number)` track
/// number word.
#[inline]
pub const fn track_number(item_type: u8, count: u8, element_type: u8, number: u8) -> u32 {
    ((item_type as u32) << 24) | ((count as u32) << 16) | ((element_type as u32) << 8) | number as u32
}

/// Essence element key for a track number.
pub const fn element_key(track_number: u32) -> Key {
    let n = track_number;
    Ul([
        ELEMENT_KEY_PREFIX[0],
        ELEMENT_KEY_PREFIX[1],
        ELEMENT_KEY_PREFIX[2],
        ELEMENT_KEY_PREFIX[3],
        ELEMENT_KEY_PREFIX[4],
        ELEMENT_KEY_PREFIX[5],
        ELEMENT_KEY_PREFIX[6],
        ELEMENT_KEY_PREFIX[7],
        ELEMENT_KEY_PREFIX[8],
        ELEMENT_KEY_PREFIX[9],
        ELEMENT_KEY_PREFIX[10],
        ELEMENT_KEY_PREFIX[11],
        (n >> 24) as u8,
        (n >> 16) as u8,
        (n >> 8) as u8,
        n as u8,
    ])
}

/// Archive video element key (uncompressed, frame wrapped, single element).
pub const fn archive_video_element_key() -> Key {
    element_key(track_number(PICTURE_ITEM_TYPE, 1, UNC_FRAME_WRAPPED_EE_TYPE, 1))
}

/// Archive audio element key for audio element `index` (0-based) out of
/// `track_count` BWF frame-wrapped elements.
pub const fn archive_audio_element_key(track_count: u8, index: u8) -> Key {
    element_key(track_number(
        SOUND_ITEM_TYPE,
        track_count,
        BWF_FRAME_WRAPPED_EE_TYPE,
        index + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_element_keys_match_registry() {
        let video = archive_video_element_key();
        assert_eq!(
            video.0,
            [0x06, 0x0e, 0x2b, 0x34, 0x01, 0x02, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x15, 0x01,
             0x02, 0x01]
        );
        // octet 13 carries the session track count, octet 15 the element
        let audio = archive_audio_element_key(4, 2);
        assert_eq!(audio.0[12], 0x16);
        assert_eq!(audio.0[13], 4);
        assert_eq!(audio.0[14], 0x01);
        assert_eq!(audio.0[15], 3);
    }

    #[test]
    fn track_number_packs_octets() {
        assert_eq!(track_number(0x15, 0x01, 0x02, 0x01), 0x1501_0201);
    }
}
