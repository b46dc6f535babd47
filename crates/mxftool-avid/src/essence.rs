//! Essence kinds the clip writer supports and their per-track wiring.

use mxftool_core::{Key, Rational, Ul, RATE_25, RATE_30_DROP, RATE_48K};
use mxftool_labels::essence;

use crate::{Error, Result};

/// Avid project format; fixes the project edit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFormat {
    Pal25i,
    Ntsc30i,
}

impl ProjectFormat {
    pub fn edit_rate(self) -> Rational {
        match self {
            ProjectFormat::Pal25i => RATE_25,
            ProjectFormat::Ntsc30i => RATE_30_DROP,
        }
    }
}

/// Supported essence kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EssenceKind {
    /// Avid MJPEG 2:1, PAL only, VBR.
    Mjpeg21,
    /// Avid MJPEG 3:1, PAL only, VBR.
    Mjpeg31,
    /// Avid MJPEG 10:1, PAL only, VBR.
    Mjpeg101,
    /// Avid MJPEG 15:1s, PAL only, VBR.
    Mjpeg151s,
    /// Avid MJPEG 20:1, PAL only, VBR.
    Mjpeg201,
    /// IEC DV 25 Mbit/s.
    IecDv25,
    /// DV-based 25 Mbit/s.
    DvBased25,
    /// DV-based 50 Mbit/s.
    DvBased50,
    /// BWF PCM audio at 48 kHz.
    Pcm,
}

impl EssenceKind {
    pub fn is_picture(self) -> bool {
        !matches!(self, EssenceKind::Pcm)
    }

    pub fn is_mjpeg(self) -> bool {
        matches!(
            self,
            EssenceKind::Mjpeg21
                | EssenceKind::Mjpeg31
                | EssenceKind::Mjpeg101
                | EssenceKind::Mjpeg151s
                | EssenceKind::Mjpeg201
        )
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            EssenceKind::Mjpeg21 => "MJPEG 2:1",
            EssenceKind::Mjpeg31 => "MJPEG 3:1",
            EssenceKind::Mjpeg101 => "MJPEG 10:1",
            EssenceKind::Mjpeg151s => "MJPEG 15:1s",
            EssenceKind::Mjpeg201 => "MJPEG 20:1",
            EssenceKind::IecDv25 => "IEC DV 25",
            EssenceKind::DvBased25 => "DV-based 25",
            EssenceKind::DvBased50 => "DV-based 50",
            EssenceKind::Pcm => "PCM",
        }
    }

    /// Avid resolution identifier for the picture descriptors.
    pub(crate) fn resolution_id(self) -> Option<i32> {
        match self {
            EssenceKind::Mjpeg21 => Some(0x4c),
            EssenceKind::Mjpeg31 => Some(0x4d),
            EssenceKind::Mjpeg101 => Some(0x4b),
            EssenceKind::Mjpeg151s => Some(0x4f),
            EssenceKind::Mjpeg201 => Some(0x52),
            EssenceKind::IecDv25 => Some(0x8d),
            EssenceKind::DvBased25 => Some(0x8c),
            EssenceKind::DvBased50 => Some(0x8e),
            EssenceKind::Pcm => None,
        }
    }

    pub(crate) fn picture_coding(self) -> Option<Ul> {
        match self {
            EssenceKind::Mjpeg21 => Some(essence::AVID_MJPEG_21_PAL),
            EssenceKind::Mjpeg31 => Some(essence::AVID_MJPEG_31_PAL),
            EssenceKind::Mjpeg101 => Some(essence::AVID_MJPEG_101_PAL),
            EssenceKind::Mjpeg151s => Some(essence::AVID_MJPEG_151S_PAL),
            EssenceKind::Mjpeg201 => Some(essence::AVID_MJPEG_201_PAL),
            EssenceKind::IecDv25 => Some(essence::IECDV_25_625_50_CODING),
            EssenceKind::DvBased25 => Some(essence::DVBASED_25_625_50_CODING),
            EssenceKind::DvBased50 => Some(essence::DVBASED_50_625_50_CODING),
            EssenceKind::Pcm => None,
        }
    }
}

/// Per-kind parameters supplied at registration.
#[derive(Debug, Clone, Copy)]
pub struct EssenceParams {
    /// PCM quantization bits.
    pub quantization_bits: u32,
}

impl Default for EssenceParams {
    fn default() -> Self {
        EssenceParams {
            quantization_bits: 16,
        }
    }
}

/// Resolved wiring of one registered track.
#[derive(Debug, Clone)]
pub(crate) struct TrackConfig {
    pub edit_rate: Rational,
    pub container_label: Ul,
    pub essence_track_number: u32,
    pub element_key: Key,
    pub element_llen: u8,
    pub min_llen: u8,
    /// 0 for VBR essence.
    pub edit_unit_byte_count: u32,
}

pub(crate) fn resolve(
    kind: EssenceKind,
    format: ProjectFormat,
    params: EssenceParams,
) -> Result<TrackConfig> {
    let pal = format == ProjectFormat::Pal25i;
    let config = match kind {
        EssenceKind::Mjpeg21
        | EssenceKind::Mjpeg31
        | EssenceKind::Mjpeg101
        | EssenceKind::Mjpeg151s
        | EssenceKind::Mjpeg201 => {
            // only PAL 25i is currently supported
            if !pal {
                return Err(Error::UnsupportedInProjectFormat { kind: kind.name() });
            }
            let track_number = essence::track_number(
                essence::PICTURE_ITEM_TYPE,
                1,
                essence::AVID_MJPEG_CLIP_WRAPPED_EE_TYPE,
                1,
            );
            TrackConfig {
                edit_rate: format.edit_rate(),
                container_label: essence::AVID_MJPEG_CLIP_WRAPPED,
                essence_track_number: track_number,
                element_key: essence::element_key(track_number),
                element_llen: 8,
                min_llen: 9, // older Avid versions reject anything less
                edit_unit_byte_count: 0,
            }
        }
        EssenceKind::IecDv25 | EssenceKind::DvBased25 | EssenceKind::DvBased50 => {
            let (container_label, edit_unit_byte_count) = match (kind, pal) {
                (EssenceKind::IecDv25, true) => (essence::IECDV_25_625_50_CLIP_WRAPPED, 144_000),
                (EssenceKind::IecDv25, false) => (essence::IECDV_25_525_60_CLIP_WRAPPED, 120_000),
                (EssenceKind::DvBased25, true) => {
                    (essence::DVBASED_25_625_50_CLIP_WRAPPED, 144_000)
                }
                (EssenceKind::DvBased25, false) => {
                    (essence::DVBASED_25_525_60_CLIP_WRAPPED, 120_000)
                }
                (EssenceKind::DvBased50, true) => {
                    (essence::DVBASED_50_625_50_CLIP_WRAPPED, 288_000)
                }
                _ => (essence::DVBASED_50_525_60_CLIP_WRAPPED, 240_000),
            };
            let track_number = essence::track_number(
                essence::DV_ITEM_TYPE,
                1,
                essence::DV_CLIP_WRAPPED_EE_TYPE,
                1,
            );
            TrackConfig {
                edit_rate: format.edit_rate(),
                container_label,
                essence_track_number: track_number,
                element_key: essence::element_key(track_number),
                element_llen: 8,
                min_llen: 4,
                edit_unit_byte_count,
            }
        }
        EssenceKind::Pcm => {
            let track_number = essence::track_number(
                essence::SOUND_ITEM_TYPE,
                1,
                essence::BWF_CLIP_WRAPPED_EE_TYPE,
                1,
            );
            TrackConfig {
                edit_rate: RATE_48K,
                container_label: essence::BWF_CLIP_WRAPPED,
                essence_track_number: track_number,
                element_key: essence::element_key(track_number),
                element_llen: 8,
                min_llen: 4,
                edit_unit_byte_count: params.quantization_bits.div_ceil(8),
            }
        }
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mjpeg_is_pal_only_and_vbr() {
        let err = resolve(
            EssenceKind::Mjpeg201,
            ProjectFormat::Ntsc30i,
            EssenceParams::default(),
        );
        assert!(matches!(err, Err(Error::UnsupportedInProjectFormat { .. })));

        let config = resolve(
            EssenceKind::Mjpeg201,
            ProjectFormat::Pal25i,
            EssenceParams::default(),
        )
        .unwrap();
        assert_eq!(config.edit_unit_byte_count, 0);
        assert_eq!(config.min_llen, 9);
    }

    #[test]
    fn pcm_edit_unit_is_bytes_per_sample() {
        let config = resolve(
            EssenceKind::Pcm,
            ProjectFormat::Pal25i,
            EssenceParams {
                quantization_bits: 16,
            },
        )
        .unwrap();
        assert_eq!(config.edit_unit_byte_count, 2);
        assert_eq!(config.edit_rate, RATE_48K);

        let config = resolve(
            EssenceKind::Pcm,
            ProjectFormat::Ntsc30i,
            EssenceParams {
                quantization_bits: 20,
            },
        )
        .unwrap();
        assert_eq!(config.edit_unit_byte_count, 3);
    }

    #[test]
    fn dv_sizes_depend_on_format() {
        let pal = resolve(
            EssenceKind::DvBased50,
            ProjectFormat::Pal25i,
            EssenceParams::default(),
        )
        .unwrap();
        assert_eq!(pal.edit_unit_byte_count, 288_000);
        let ntsc = resolve(
            EssenceKind::DvBased50,
            ProjectFormat::Ntsc30i,
            EssenceParams::default(),
        )
        .unwrap();
        assert_eq!(ntsc.edit_unit_byte_count, 240_000);
    }
}
