//! Property-based tests for the KLV codec.

use mxftool_core::{convert_position, MxfStream, Rational, Ul};
use proptest::prelude::*;
use std::io::Cursor;

proptest! {
    /// Any length written with any legal min_llen reads back unchanged.
    #[test]
    fn ber_length_round_trip(len in 0u64..=u64::MAX / 2, min_llen in 1u8..=9) {
        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        stream.set_min_llen(min_llen).unwrap();
        let written = stream.write_l(len).unwrap();
        stream.seek_to(0).unwrap();
        let (llen, read) = stream.read_l().unwrap();
        prop_assert_eq!(read, len);
        prop_assert_eq!(llen, written);
        prop_assert!(llen >= min_llen || (len <= 127 && min_llen == 1));
    }

    /// Fixed-width lengths read back with exactly the requested width.
    #[test]
    fn fixed_llen_round_trip(len in 0u64..=0xFFFF_FFFF, llen in 5u8..=9) {
        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        stream.write_fixed_l(llen, len).unwrap();
        stream.seek_to(0).unwrap();
        prop_assert_eq!(stream.read_l().unwrap(), (llen, len));
    }

    /// A filler of any legal size occupies exactly that many bytes and is
    /// skipped by the non-filler scan.
    #[test]
    fn fill_is_exact_and_skippable(size in 17u64..=65536, min_llen in 1u8..=4) {
        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        stream.set_min_llen(min_llen).unwrap();
        if size < 16 + u64::from(min_llen) {
            prop_assert!(stream.write_fill(size).is_err());
            return Ok(());
        }
        stream.write_fill(size).unwrap();
        prop_assert_eq!(stream.position().unwrap(), size);
        let marker = Ul([0x42; 16]);
        stream.write_kl(&marker, 0).unwrap();
        stream.seek_to(0).unwrap();
        let (key, _, _) = stream.read_next_nonfiller_kl().unwrap();
        prop_assert_eq!(key, marker);
    }

    /// The BER reader never panics on arbitrary bytes.
    #[test]
    fn ber_reader_no_panic(data in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut stream = MxfStream::new(Cursor::new(data));
        let _ = stream.read_l();
    }

    /// Converting there and back is the identity when the target rate is an
    /// integer multiple of the source rate.
    #[test]
    fn rate_conversion_round_trip(n in 0i64..=1_000_000, factor in 1i32..=2000) {
        let from = Rational::new(25, 1);
        let to = Rational::new(25 * factor, 1);
        prop_assert_eq!(convert_position(convert_position(n, from, to), to, from), n);
    }
}
