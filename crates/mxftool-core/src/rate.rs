//! Edit-rate reconciliation.
//!
//! Durations are carried on entities with different edit rates (video at
//! 25/1, audio at 48000/1, ...). Conversions round half-up in exact
//! integer arithmetic.

use crate::Rational;

/// Convert `position` from `from` edit units to `to` edit units, rounding
/// half-up: `round(position * (to / from))`.
pub fn convert_position(position: i64, from: Rational, to: Rational) -> i64 {
    if from == to || position == 0 {
        return position;
    }
    let num = i128::from(to.num) * i128::from(from.den);
    let den = i128::from(to.den) * i128::from(from.num);
    // floor((2 * position * num + den) / (2 * den)) == round half-up
    let scaled = 2 * i128::from(position) * num + den;
    (scaled.div_euclid(2 * den)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RATE_25, RATE_48K};

    #[test]
    fn identity_when_rates_equal() {
        assert_eq!(convert_position(99, RATE_25, RATE_25), 99);
    }

    #[test]
    fn video_to_audio_rate() {
        assert_eq!(convert_position(1, RATE_25, RATE_48K), 1920);
        assert_eq!(convert_position(25, RATE_25, RATE_48K), 48000);
        assert_eq!(convert_position(50, RATE_48K, RATE_25), 0);
        // 960 audio samples is exactly half a frame; half rounds up
        assert_eq!(convert_position(960, RATE_48K, RATE_25), 1);
    }

    #[test]
    fn ntsc_rate_rounds_half_up() {
        let ntsc = Rational::new(30000, 1001);
        // 30000 NTSC frames are 1001 seconds exactly
        assert_eq!(convert_position(30000, ntsc, RATE_48K), 1001 * 48000);
        // one frame is 1601.6 samples, which rounds up
        assert_eq!(convert_position(1, ntsc, RATE_48K), 1602);
    }

    #[test]
    fn round_trips_when_target_is_integer_multiple() {
        for n in [0i64, 1, 7, 24, 25, 1000] {
            let there = convert_position(n, RATE_25, RATE_48K);
            assert_eq!(convert_position(there, RATE_48K, RATE_25), n);
        }
    }
}
